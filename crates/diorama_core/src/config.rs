use clap::Parser;
use std::path::PathBuf;

/// `diorama` - a snowy 3D board with ambient traffic, ready for a match.
///
/// Every option can also be supplied through its `DIORAMA_*` environment
/// variable.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Initial window width in physical pixels.
    #[arg(long, env = "DIORAMA_WINDOW_WIDTH", default_value_t = 1280)]
    pub window_width: u32,

    /// Initial window height in physical pixels.
    #[arg(long, env = "DIORAMA_WINDOW_HEIGHT", default_value_t = 720)]
    pub window_height: u32,

    /// Directory that asset paths (models, manifest entries) are resolved against.
    #[arg(long, env = "DIORAMA_ASSET_ROOT", default_value = ".")]
    pub asset_root: PathBuf,

    /// Decoration manifest, relative to the asset root unless absolute.
    #[arg(long, env = "DIORAMA_MANIFEST", default_value = "assets/decorations/decors.json")]
    pub manifest: PathBuf,

    /// Base path handed to the board for tile textures.
    #[arg(long, env = "DIORAMA_TEXTURE_PATH", default_value = "assets/textures/")]
    pub texture_path: String,

    /// Length of one match, in seconds.
    #[arg(long, env = "DIORAMA_MATCH_SECONDS", default_value_t = 60)]
    pub match_seconds: u64,

    #[arg(long, env = "DIORAMA_BOARD_WIDTH", default_value_t = 10)]
    pub board_width: u32,

    #[arg(long, env = "DIORAMA_BOARD_HEIGHT", default_value_t = 10)]
    pub board_height: u32,

    /// Number of snow particles.
    #[arg(long, env = "DIORAMA_SNOW_PARTICLES", default_value_t = crate::particles::SNOW_PARTICLE_COUNT)]
    pub snow_particles: usize,

    /// Fixed seed for the snow field; random when absent.
    #[arg(long, env = "DIORAMA_SEED")]
    pub seed: Option<u64>,
}

impl Config {
    pub fn manifest_path(&self) -> PathBuf {
        if self.manifest.is_absolute() {
            self.manifest.clone()
        } else {
            self.asset_root.join(&self.manifest)
        }
    }
}
