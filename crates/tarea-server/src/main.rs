fn main() {
    if let Err(err) = tarea_server::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
