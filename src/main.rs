fn main() {
    if let Err(e) = clinic_desk::run() {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
