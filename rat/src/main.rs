use {
    atlas::{Asset, Atlas, Error as AtlasError, Filter, ImageData, Invalid, Observer, Parameters},
    clap::Parser,
    dds::Error as DdsError,
    glob::PatternError,
    im::Error as ImageError,
    serde_json::Error as JsonError,
    std::{
        env,
        ffi::OsString,
        fmt, fs,
        path::{Path, PathBuf},
        process::ExitCode,
    },
};

/// Packs images into a mipmapped texture atlas
#[derive(Parser)]
struct Cli {
    /// The atlas name, used for output files
    name: String,

    /// Pathes or glob patterns of source images
    sources: Vec<String>,

    /// Print errors only
    #[arg(short, long)]
    silent: bool,

    /// Don't generate mip levels
    #[arg(long)]
    nomips: bool,

    /// Number of mip levels below the original image (-1 is unlimited)
    #[arg(short, long, default_value_t = -1, allow_negative_numbers = true)]
    mips: i32,

    /// Interpolation mode (nearest|bilinear|bicubic)
    #[arg(short, long, default_value_t = Filter::Bilinear)]
    interpolation: Filter,

    /// Number of grid columns
    #[arg(short = 'x', long, default_value_t = 1)]
    columns: u32,

    /// Specify output directory (current by default)
    #[arg(short, long)]
    outdir: Option<PathBuf>,

    /// Write the atlas map to a .json file
    #[arg(long)]
    json: bool,

    /// Don't write .png files of mip levels
    #[arg(long)]
    no_png: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.silent);
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn init_logger(silent: bool) {
    let filter = if silent { "error" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), Error> {
    let mip_count = if cli.nomips { 0 } else { cli.mips };
    let params = Parameters::new(mip_count, cli.interpolation, cli.columns)?;
    let paths = expand(&cli.sources)?;
    let data = read_sources(paths);
    let atlas = atlas::make(&cli.name, data, &params, &mut Progress)?;

    let (width, height) = atlas.size();
    log::info!(
        "packed {} of {} images in {width}x{height} atlas with {} mip levels",
        atlas.children().len(),
        atlas.children().len() + atlas.dropped().len() + atlas.missing().len(),
        atlas.mips().len(),
    );

    let outdir = make_outdir(cli.outdir)?;
    let name = &cli.name;

    let dds_file = format!("{name}.dds");
    let data = dds::encode(width, height, atlas.mips())?;
    write_file(&outdir.join(&dds_file), &data)?;

    let invocation: Vec<_> = env::args().collect();
    let mut index = vec![];
    let index_path = outdir.join(format!("{name}.tai"));
    atlas::write_index(&mut index, &atlas, &dds_file, &invocation.join(" "))
        .map_err(|_| Error::WriteToFile(index_path.clone()))?;

    write_file(&index_path, &index)?;

    if cli.json {
        let map = serde_json::to_vec(&atlas.map())?;
        write_file(&outdir.join(format!("{name}.json")), &map)?;
    }

    if !cli.no_png {
        write_pngs(&atlas, name, &outdir)?;
    }

    Ok(())
}

struct Progress;

impl Observer for Progress {
    fn loaded(&mut self, asset: &Asset) {
        log::info!("loaded {}: {}", asset.id(), asset.name());
    }

    fn processed(&mut self, asset: &Asset) {
        log::info!("processed {}: {}", asset.id(), asset.name());
    }

    fn packed(&mut self, asset: &Asset) {
        log::info!("packed {}: {}", asset.id(), asset.name());
    }
}

/// Expands glob patterns in the given order.
/// A pattern without matches is kept as a path.
fn expand(patterns: &[String]) -> Result<Vec<PathBuf>, Error> {
    let mut paths = vec![];
    for pattern in patterns {
        let matched: Vec<_> = glob::glob(pattern)?
            .filter_map(Result::ok)
            .filter(|path| !path.is_dir())
            .collect();

        if matched.is_empty() {
            paths.push(PathBuf::from(pattern));
        } else {
            paths.extend(matched);
        }
    }

    Ok(paths)
}

fn read_sources(paths: Vec<PathBuf>) -> Vec<ImageData> {
    paths
        .into_iter()
        .map(|path| {
            let name = path
                .file_name()
                .unwrap_or(path.as_os_str())
                .to_string_lossy()
                .into();

            let data = match fs::read(&path) {
                Ok(data) => Some(data),
                Err(err) => {
                    log::warn!("failed to read file {path:?}: {err}");
                    None
                }
            };

            ImageData { name, data }
        })
        .collect()
}

fn make_outdir(outdir: Option<PathBuf>) -> Result<PathBuf, Error> {
    let outdir = outdir
        .or_else(|| env::current_dir().ok())
        .ok_or(Error::OutDir)?;

    if !outdir.exists() {
        fs::create_dir_all(&outdir).map_err(|_| Error::OutDir)?;
    }

    Ok(outdir)
}

fn write_pngs(atlas: &Atlas, name: &str, outdir: &Path) -> Result<(), Error> {
    for (level, mip) in atlas.mips().iter().enumerate() {
        let path = match level {
            0 => outdir.join(format!("{name}.png")),
            _ => outdir.join(format!("{name}-{level}.png")),
        };

        let png = im::encode_png(mip)?;
        write_file(&path, &png)?;
    }

    Ok(())
}

/// Writes the file through a temporary sibling, so a failed write leaves
/// no partial file behind.
fn write_file(path: &Path, data: &[u8]) -> Result<(), Error> {
    let part = {
        let mut part = OsString::from(path);
        part.push(".part");
        PathBuf::from(part)
    };

    log::info!("write file {path:?}");
    if fs::write(&part, data)
        .and_then(|()| fs::rename(&part, path))
        .is_err()
    {
        _ = fs::remove_file(&part);
        return Err(Error::WriteToFile(path.to_owned()));
    }

    Ok(())
}

#[derive(Debug)]
enum Error {
    OutDir,
    WriteToFile(PathBuf),
    Pattern(PatternError),
    Params(Invalid),
    Atlas(AtlasError),
    Encode(DdsError),
    Image(ImageError),
    Json(JsonError),
}

impl From<PatternError> for Error {
    fn from(v: PatternError) -> Self {
        Self::Pattern(v)
    }
}

impl From<Invalid> for Error {
    fn from(v: Invalid) -> Self {
        Self::Params(v)
    }
}

impl From<AtlasError> for Error {
    fn from(v: AtlasError) -> Self {
        Self::Atlas(v)
    }
}

impl From<DdsError> for Error {
    fn from(v: DdsError) -> Self {
        Self::Encode(v)
    }
}

impl From<ImageError> for Error {
    fn from(v: ImageError) -> Self {
        Self::Image(v)
    }
}

impl From<JsonError> for Error {
    fn from(v: JsonError) -> Self {
        Self::Json(v)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::OutDir => write!(f, "failed to get output directory"),
            Self::WriteToFile(path) => write!(f, "failed to write file {path:?}"),
            Self::Pattern(err) => write!(f, "invalid source pattern: {err}"),
            Self::Params(err) => write!(f, "{err}"),
            Self::Atlas(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode dds: {err}"),
            Self::Image(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "{err}"),
        }
    }
}
