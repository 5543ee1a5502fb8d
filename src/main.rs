fn main() {
    if let Err(err) = linecount::run() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
