use std::process::ExitCode;

fn main() -> ExitCode {
    scrubdump::run()
}
