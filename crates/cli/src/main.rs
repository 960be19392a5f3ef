fn main() {
    pdfview_cli::init_tracing();

    if let Err(error) = pdfview_cli::run(std::env::args_os()) {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}
