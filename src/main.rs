fn main() {
    env_logger::init();

    if let Err(err) = labelpack::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
