/// Packages the plugin with nih_plug_xtask's `bundle` subcommand:
///
///   cargo xtask bundle flangerift --release
///
/// The bundles land in `target/bundled/`.
fn main() -> nih_plug_xtask::Result<()> {
    nih_plug_xtask::main()
}
