fn main() {
    asc_cli::init_logging();
    std::process::exit(asc_cli::run_cli_from_args(std::env::args_os()));
}
