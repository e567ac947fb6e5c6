use std::env;

fn main() -> nih_plug_xtask::Result<()> {
    let args = env::args().collect::<Vec<_>>();

    // `--target <triple>` keeps per-target bundles apart under target/<triple>
    if let Some(triple) = args
        .iter()
        .position(|a| a == "--target")
        .and_then(|pos| args.get(pos + 1))
    {
        env::set_var("CARGO_TARGET_DIR", format!("target/{triple}"));
    }

    nih_plug_xtask::main()
}
