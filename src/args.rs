use skill_trigger::template_matching::SearchStrategy;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum Mode {
    /// One-shot search of a template inside a region image
    Match { region: PathBuf, template: PathBuf },
    /// Run the detection loop over a directory of frames
    Replay { frames_dir: PathBuf },
    /// List saved profiles
    Profiles,
}

#[derive(Debug)]
pub struct Args {
    pub mode: Mode,
    pub debug_mode: bool,
    pub threshold: Option<f32>,
    pub strategy: SearchStrategy,
    pub profile: Option<String>,
    pub config_dir: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

impl Args {
    pub fn parse() -> Option<Self> {
        Self::parse_from(env::args().skip(1))
    }

    pub fn parse_from<I>(args: I) -> Option<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();

        let mut mode: Option<Mode> = None;
        let mut debug_mode = false;
        let mut threshold: Option<f32> = None;
        let mut strategy = SearchStrategy::HashedWindow;
        let mut profile: Option<String> = None;
        let mut config_dir: Option<PathBuf> = None;
        let mut timeout_secs: Option<u64> = None;

        while let Some(arg) = args.next() {
            if arg == "--help" || arg == "-h" {
                print_help();
                return None;
            } else if arg == "--version" || arg == "-v" {
                println!(
                    "Skill Trigger v{} (built {})",
                    env!("APP_VERSION_DISPLAY"),
                    env!("APP_BUILD_YEAR")
                );
                return None;
            } else if arg == "--debug" {
                debug_mode = true;
            } else if arg == "--profiles" {
                mode = Some(Mode::Profiles);
            } else if arg == "--match" {
                let (Some(region), Some(template)) = (args.next(), args.next()) else {
                    eprintln!("❌ --match needs <region.png> <template.png>");
                    return None;
                };
                mode = Some(Mode::Match {
                    region: PathBuf::from(region),
                    template: PathBuf::from(template),
                });
            } else if arg == "--replay" {
                let Some(frames_dir) = args.next() else {
                    eprintln!("❌ --replay needs <frames_dir>");
                    return None;
                };
                mode = Some(Mode::Replay {
                    frames_dir: PathBuf::from(frames_dir),
                });
            } else if let Some(val) = arg.strip_prefix("--threshold=") {
                match val.parse::<f32>() {
                    Ok(t) if t > 0.0 && t <= 1.0 => threshold = Some(t),
                    _ => {
                        eprintln!("❌ Invalid threshold value: {}", val);
                        return None;
                    }
                }
            } else if let Some(val) = arg.strip_prefix("--strategy=") {
                match val.parse::<SearchStrategy>() {
                    Ok(s) => strategy = s,
                    Err(e) => {
                        eprintln!("❌ {}", e);
                        return None;
                    }
                }
            } else if let Some(val) = arg.strip_prefix("--profile=") {
                profile = Some(val.to_string());
            } else if let Some(val) = arg.strip_prefix("--config-dir=") {
                config_dir = Some(PathBuf::from(val));
            } else if let Some(val) = arg.strip_prefix("--timeout=") {
                match val.parse::<u64>() {
                    Ok(secs) => timeout_secs = Some(secs),
                    Err(_) => {
                        eprintln!("❌ Invalid timeout value: {}", val);
                        return None;
                    }
                }
            } else {
                eprintln!("❌ Unknown argument: {}", arg);
                print_help();
                return None;
            }
        }

        let Some(mode) = mode else {
            print_help();
            return None;
        };

        Some(Args {
            mode,
            debug_mode,
            threshold,
            strategy,
            profile,
            config_dir,
            timeout_secs,
        })
    }
}

fn print_help() {
    println!("🎯 Skill Trigger - icon recognition hotkey tool");
    println!();
    println!("USAGE:");
    println!("    skill-trigger <MODE> [FLAGS]");
    println!();
    println!("MODES:");
    println!("    --match <region.png> <template.png>   Search a template inside a region image");
    println!("    --replay <frames_dir>                 Run detection over PNG frames (keys are only logged)");
    println!("    --profiles                            List saved profiles");
    println!();
    println!("FLAGS:");
    println!("    --threshold=T       Match threshold in (0, 1] (default 0.9)");
    println!("    --strategy=S        hashed | ncc | sqdiff | multiscale | edges (default hashed)");
    println!("    --profile=NAME      Profile to load for --replay");
    println!("    --config-dir=DIR    Base directory for profiles (default ~/.skill-trigger)");
    println!("    --timeout=N         Stop replay after N seconds");
    println!("    --debug             Enable debug logging");
    println!("    --help, -h          Show this help message");
    println!("    --version, -v       Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    skill-trigger --match bar.png fireball.png --strategy=ncc");
    println!("    skill-trigger --replay ./frames --profile=mage --timeout=30");
}
