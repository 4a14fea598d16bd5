fn main() {
    if let Err(err) = notegraph::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
