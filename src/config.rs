use crate::types::{IndexOptions, Region};
use crate::{Error, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Parser)]
#[command(name = "tabixr")]
#[command(about = "Index and query BGZF-compressed tab-delimited genomic files")]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Build FILE.tbi for a BGZF-compressed file
    Index(IndexArgs),
    /// Print the lines overlapping one or more regions
    Query(QueryArgs),
    /// Merge the indices of files to be concatenated in the given order
    Merge(MergeArgs),
    /// List the sequence names of an indexed file
    List {
        /// Indexed BGZF file
        file: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PresetArg {
    Gff,
    Bed,
    Sam,
    Vcf,
}

impl PresetArg {
    /// Guesses the preset from a file name such as `calls.vcf.gz`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        let name = name.strip_suffix(".gz").or_else(|| name.strip_suffix(".bgz")).unwrap_or(&name);

        match name.rsplit('.').next()? {
            "gff" | "gff3" | "gtf" => Some(PresetArg::Gff),
            "bed" => Some(PresetArg::Bed),
            "sam" => Some(PresetArg::Sam),
            "vcf" => Some(PresetArg::Vcf),
            _ => None,
        }
    }

    pub fn options(&self) -> IndexOptions {
        match self {
            PresetArg::Gff => IndexOptions::gff(),
            PresetArg::Bed => IndexOptions::bed(),
            PresetArg::Sam => IndexOptions::sam(),
            PresetArg::Vcf => IndexOptions::vcf(),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct IndexArgs {
    /// BGZF-compressed, position-sorted file
    pub file: PathBuf,

    /// Column layout preset (guessed from the file name when omitted, gff otherwise)
    #[arg(short, long, value_enum)]
    pub preset: Option<PresetArg>,

    /// Sequence name column (1-based)
    #[arg(short = 's', long)]
    pub sequence: Option<usize>,

    /// Start column (1-based)
    #[arg(short = 'b', long)]
    pub begin: Option<usize>,

    /// End column (1-based), 0 for none
    #[arg(short = 'e', long)]
    pub end: Option<usize>,

    /// Lines starting with this character are headers
    #[arg(short = 'c', long)]
    pub comment: Option<char>,

    /// Number of header lines to skip at the top of the file
    #[arg(short = 'S', long)]
    pub skip_lines: Option<u32>,

    /// Coordinates are 0-based half-open (BED style)
    #[arg(short = '0', long)]
    pub zero_based: bool,

    /// Overwrite an existing index
    #[arg(short, long)]
    pub force: bool,
}

impl IndexArgs {
    pub fn options(&self) -> Result<IndexOptions> {
        let preset = self
            .preset
            .or_else(|| PresetArg::from_path(&self.file))
            .unwrap_or(PresetArg::Gff);
        let mut options = preset.options();

        let column = |value: usize, name: &str| -> Result<usize> {
            value
                .checked_sub(1)
                .ok_or_else(|| Error::InvalidInput(format!("{} column must be at least 1", name)))
        };

        if let Some(seq) = self.sequence {
            options.seq_col = column(seq, "sequence")?;
        }
        if let Some(begin) = self.begin {
            options.begin_col = column(begin, "begin")?;
        }
        if let Some(end) = self.end {
            options.end_col = match end {
                0 => None,
                end => Some(column(end, "end")?),
            };
        }
        if let Some(comment) = self.comment {
            options.meta_char = u8::try_from(comment)
                .ok()
                .filter(u8::is_ascii)
                .ok_or_else(|| Error::InvalidInput(format!("comment character must be ASCII: {:?}", comment)))?;
        }
        if let Some(skip) = self.skip_lines {
            options.skip_lines = skip;
        }
        if self.zero_based {
            options.zero_based = true;
        }

        Ok(options)
    }

    pub fn index_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.tbi", self.file.display()))
    }
}

#[derive(Debug, Clone, Args)]
pub struct QueryArgs {
    /// Indexed BGZF file
    pub file: PathBuf,

    /// Regions as NAME, NAME:START or NAME:START-END (1-based, inclusive)
    pub regions: Vec<String>,

    /// Read regions from a file of NAME<TAB>START<TAB>END lines (0-based, half-open)
    #[arg(short = 'R', long)]
    pub regions_file: Option<PathBuf>,

    /// Print the header lines before the results
    #[arg(short = 'H', long)]
    pub print_header: bool,
}

impl QueryArgs {
    /// Regions from the command line followed by those of the regions file.
    pub fn regions(&self) -> Result<Vec<Region>> {
        let mut regions = self
            .regions
            .iter()
            .map(|s| s.parse())
            .collect::<Result<Vec<Region>>>()?;

        if let Some(path) = &self.regions_file {
            let text = std::fs::read_to_string(path).map_err(|e| Error::in_file(path)(e.into()))?;
            regions.extend(parse_regions_file(&text).map_err(Error::in_file(path))?);
        }

        Ok(regions)
    }
}

/// Parses BED-like region lines; a line with only a name covers the whole sequence.
pub fn parse_regions_file(text: &str) -> Result<Vec<Region>> {
    let mut regions = Vec::new();

    for (i, line) in text.lines().enumerate() {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.split('\t');
        let name = fields.next().unwrap_or_default();
        let coordinate = |value: Option<&str>| -> Result<Option<u64>> {
            value
                .map(|v| {
                    v.parse().map_err(|_| {
                        Error::InvalidRange(format!("line {}: invalid coordinate {:?}", i + 1, v))
                    })
                })
                .transpose()
        };

        let start = coordinate(fields.next())?;
        let end = coordinate(fields.next())?;
        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                return Err(Error::InvalidRange(format!(
                    "line {}: start {} is greater than end {}",
                    i + 1,
                    start,
                    end
                )));
            }
        }

        regions.push(Region {
            reference_name: name.to_string(),
            start,
            end,
        });
    }

    Ok(regions)
}

#[derive(Debug, Clone, Args)]
pub struct MergeArgs {
    /// Where to write the merged index
    #[arg(short, long)]
    pub output: PathBuf,

    /// Indexed BGZF files, in concatenation order
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_args(file: &str) -> IndexArgs {
        IndexArgs {
            file: PathBuf::from(file),
            preset: None,
            sequence: None,
            begin: None,
            end: None,
            comment: None,
            skip_lines: None,
            zero_based: false,
            force: false,
        }
    }

    #[test]
    fn test_preset_from_path() {
        assert_eq!(PresetArg::from_path(Path::new("a/calls.vcf.gz")), Some(PresetArg::Vcf));
        assert_eq!(PresetArg::from_path(Path::new("peaks.BED.gz")), Some(PresetArg::Bed));
        assert_eq!(PresetArg::from_path(Path::new("genes.gff3.bgz")), Some(PresetArg::Gff));
        assert_eq!(PresetArg::from_path(Path::new("data.txt.gz")), None);
    }

    #[test]
    fn test_index_options_overrides() {
        let mut args = index_args("x.txt.gz");
        assert_eq!(args.options().unwrap(), IndexOptions::gff());

        args.sequence = Some(2);
        args.begin = Some(3);
        args.end = Some(0);
        args.comment = Some('%');
        args.skip_lines = Some(4);
        args.zero_based = true;
        let options = args.options().unwrap();
        assert_eq!((options.seq_col, options.begin_col, options.end_col), (1, 2, None));
        assert_eq!(options.meta_char, b'%');
        assert_eq!(options.skip_lines, 4);
        assert!(options.zero_based);

        args.begin = Some(0);
        assert!(args.options().is_err());
    }

    #[test]
    fn test_index_options_from_file_name() {
        assert_eq!(index_args("x.vcf.gz").options().unwrap(), IndexOptions::vcf());
        assert_eq!(index_args("x.vcf.gz").index_path(), PathBuf::from("x.vcf.gz.tbi"));
    }

    #[test]
    fn test_parse_regions_file() {
        let regions = parse_regions_file("# targets\nchr1\t0\t100\n\nchr2\nchr3\t50\n").unwrap();
        assert_eq!(
            regions,
            vec![
                Region::new("chr1", 0, 100),
                Region::whole("chr2"),
                Region {
                    reference_name: "chr3".to_string(),
                    start: Some(50),
                    end: None,
                },
            ]
        );
        assert!(parse_regions_file("chr1\tx\t5\n").is_err());
        assert!(parse_regions_file("chr1\t10\t5\n").is_err());
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let config = Config::try_parse_from(["tabixr", "query", "f.gz", "chr1:1-10", "chr2", "-H"]).unwrap();
        match config.command {
            Command::Query(args) => {
                assert_eq!(args.regions().unwrap().len(), 2);
                assert!(args.print_header);
            }
            other => panic!("unexpected command {:?}", other),
        }

        let config = Config::try_parse_from(["tabixr", "merge", "-o", "out.tbi", "a.gz", "b.gz"]).unwrap();
        assert!(matches!(config.command, Command::Merge(args) if args.files.len() == 2));

        assert!(Config::try_parse_from(["tabixr", "merge", "-o", "out.tbi"]).is_err());
    }
}
