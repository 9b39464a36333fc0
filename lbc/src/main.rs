//! Thin entry point - all real work lives in `lbc::run` (`spec.md` §6).

fn main() {
    let exit_code = lbc::run();
    std::process::exit(exit_code);
}
