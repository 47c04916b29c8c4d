//! Command-line handling.
//!
//! Most arguments belong to the delegate tool. The wrapper picks out its own
//! switches first and only those go through clap, so unknown flags reach the
//! tool untouched. `--log` is the exception: it sets the wrapper's verbosity
//! and is forwarded as well.

use clap::Parser;
use pinwrap_core::console::DEFAULT_VERBOSITY;

/// Options understood by the wrapper itself.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "pinwrap",
    no_binary_name = true,
    disable_help_flag = true,
    disable_version_flag = true,
    args_override_self = true
)]
pub struct WrapperArgs {
    /// Verbosity of wrapper messages, also passed to the tool.
    #[arg(long = "log", value_name = "LEVEL", default_value_t = DEFAULT_VERBOSITY)]
    pub log: u8,

    /// Don't touch the launcher files in the project.
    #[arg(long = "noOverwrite")]
    pub no_overwrite: bool,

    /// Install only, don't run the tool.
    #[arg(long = "noLaunch")]
    pub no_launch: bool,

    /// Print the tool and wrapper versions and exit.
    #[arg(long = "version")]
    pub version: bool,
}

/// Arguments after splitting.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SplitArgs {
    /// Tokens for [`WrapperArgs`].
    pub wrapper: Vec<String>,
    /// Tokens passed to the tool, in their original order.
    pub forwarded: Vec<String>,
}

/// Separates the wrapper's switches from the tool's arguments.
pub fn split_args<I>(args: I) -> SplitArgs
where
    I: IntoIterator<Item = String>,
{
    let mut split = SplitArgs::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--noOverwrite" | "--noLaunch" | "--version" => split.wrapper.push(arg),
            "--log" => {
                split.wrapper.push(arg.clone());
                split.forwarded.push(arg);
                if let Some(level) = args.next() {
                    split.wrapper.push(level.clone());
                    split.forwarded.push(level);
                }
            }
            _ if arg.starts_with("--log=") => {
                split.wrapper.push(arg.clone());
                split.forwarded.push(arg);
            }
            _ => split.forwarded.push(arg),
        }
    }

    split
}

/// Splits and parses the arguments (program name excluded).
pub fn parse<I>(args: I) -> Result<(WrapperArgs, Vec<String>), clap::Error>
where
    I: IntoIterator<Item = String>,
{
    let split = split_args(args);
    let wrapper = WrapperArgs::try_parse_from(split.wrapper)?;
    Ok((wrapper, split.forwarded))
}
