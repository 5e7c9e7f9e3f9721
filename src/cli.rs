use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(
    name = "bless",
    about = "Set volume bootability and startup disk options",
    long_about = "Record the system folder and boot loader of a volume in its boot metadata, \
                  and optionally point the firmware at it"
)]
pub struct Args {
    /// System folder to bless (its mount point becomes the target volume)
    #[arg(long = "folder", value_name = "DIR")]
    pub folder: Option<PathBuf>,

    /// Boot loader file to record in the volume's boot metadata
    #[arg(long = "file", value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Volume to operate on, given by any path on it
    #[arg(long = "mount", value_name = "PATH")]
    pub mount: Option<PathBuf>,

    /// Install the boot loader, optionally from an explicit source [default: volume's boot.efi]
    #[arg(long = "bootefi", value_name = "SOURCE", num_args = 0..=1)]
    pub bootefi: Option<Option<PathBuf>>,

    /// Point the firmware at this volume
    #[arg(long = "setBoot")]
    pub set_boot: bool,

    /// Only boot from the volume on the next restart
    #[arg(long = "nextonly", requires = "set_boot")]
    pub next_only: bool,

    /// Use the legacy (BIOS compatibility) boot pointer
    #[arg(long = "legacy", requires = "set_boot")]
    pub legacy: bool,

    /// Drive hint for the legacy boot pointer
    #[arg(long = "legacydrivehint", value_name = "DEVICE", requires = "legacy")]
    pub legacy_drive_hint: Option<String>,

    /// Boot options passed to the firmware with the boot pointer
    #[arg(long = "options", value_name = "OPTIONS")]
    pub options: Option<String>,

    /// Encode the firmware path pointer in its short form
    #[arg(long = "shortform")]
    pub short_form: bool,

    /// Render a text label for the firmware boot picker
    #[arg(long = "label", value_name = "TEXT", conflicts_with = "label_file")]
    pub label: Option<String>,

    /// Use a prebuilt label bitmap
    #[arg(long = "labelfile", value_name = "FILE")]
    pub label_file: Option<PathBuf>,

    /// Container driver to embed [default: the volume's apfs.efi]
    #[arg(long = "apfsdriver", value_name = "FILE", conflicts_with = "no_apfs_driver")]
    pub apfs_driver: Option<PathBuf>,

    /// Do not embed a container driver
    #[arg(long = "noapfsdriver")]
    pub no_apfs_driver: bool,

    /// Personalize the volume's boot objects
    #[arg(long = "personalize")]
    pub personalize: bool,

    /// Allow personalization to prompt the user
    #[arg(long = "allowUI", requires = "personalize")]
    pub allow_ui: bool,

    /// Verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}
