use zwatch_console::ConsoleFrontend;

fn main() {
    let matches = ConsoleFrontend::args("zwatch-console").get_matches();

    if let Err(err) = ConsoleFrontend.start(matches) {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
