//! dapcheck CLI entry point

fn main() {
    dapcheck::cli::run();
}
