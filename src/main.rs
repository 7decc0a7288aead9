use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::info;
use splatwalk::{
    config::{ControlMode, SplatReadiness, ViewerConfig, WindowConfig},
    ClearPass, GraphicsContext, PhysicalSize, Runner, Viewer, ViewerApp,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Fly,
    ThirdPerson,
}

impl From<ModeArg> for ControlMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Fly => ControlMode::Fly,
            ModeArg::ThirdPerson => ControlMode::ThirdPerson,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "splatwalk")]
#[command(about = "Walk or fly through a Gaussian-splat capture")]
#[command(version)]
struct Args {
    /// Control scheme
    #[arg(short, long, value_enum, default_value = "fly")]
    mode: ModeArg,

    /// Splat point cloud (PLY)
    #[arg(long)]
    splat: Option<PathBuf>,

    /// Avatar model (glTF binary)
    #[arg(long)]
    avatar: Option<PathBuf>,

    /// Do not load an avatar
    #[arg(long, conflicts_with = "avatar")]
    no_avatar: bool,

    /// Frame the splat by polling its bounds instead of waiting for the load to finish
    #[arg(long)]
    poll_splat: bool,

    #[arg(long, default_value = "1280")]
    width: u32,

    #[arg(long, default_value = "720")]
    height: u32,
}

impl Args {
    fn viewer_config(&self) -> ViewerConfig {
        let mut config = ViewerConfig::new(self.mode.into());
        if let Some(splat) = &self.splat {
            config = config.with_splat(splat);
        }
        if let Some(avatar) = &self.avatar {
            config = config.with_avatar(avatar);
        }
        if self.no_avatar {
            config = config.without_avatar();
        }
        if self.poll_splat {
            config.splat_readiness = SplatReadiness::Poll;
        }
        config
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = args.viewer_config();
    info!("Starting in {:?} mode, splat {:?}", config.mode, config.assets.splat);

    let rt = tokio::runtime::Builder::new_multi_thread().build()?;
    let runner = Runner::new(&WindowConfig::new().with_size(args.width, args.height))?;
    let window = runner.window();
    let ctx = GraphicsContext::new(Default::default(), &rt, window.clone())?;

    let size: PhysicalSize<u32> = window.inner_size();
    let viewer = Viewer::new(config, size);
    let mut app = ViewerApp::new(viewer, ClearPass::new(ctx), rt);
    runner.run(&mut app)
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use splatwalk::config::{ControlMode, SplatReadiness};

    use super::Args;

    #[test]
    fn parses_third_person_without_avatar() {
        let args = Args::parse_from(["splatwalk", "--mode", "third-person", "--no-avatar", "--poll-splat"]);
        let config = args.viewer_config();
        assert_eq!(config.mode, ControlMode::ThirdPerson);
        assert_eq!(config.assets.avatar, None);
        assert_eq!(config.splat_readiness, SplatReadiness::Poll);
    }

    #[test]
    fn defaults_to_fly() {
        let args = Args::parse_from(["splatwalk", "--splat", "capture.ply"]);
        let config = args.viewer_config();
        assert_eq!(config.mode, ControlMode::Fly);
        assert_eq!(config.assets.splat, std::path::PathBuf::from("capture.ply"));
    }
}
