use std::process::ExitCode;

fn main() -> ExitCode {
    tomato_focus_lib::run()
}
