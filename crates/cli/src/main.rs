//! CLI tool for extracting plain text from PDF, DOCX and text files.

use anyhow::{Context, Result};
use clap::Parser;
use doctext_core::{
    Document, DocumentFormat, FinalFlush, PlainTextReader, RunMerger, SentinelMode, TextRenderer,
};
use doctext_pdf::Granularity;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

/// Offline evaluation key used when no `--license` file is given.
const EVALUATION_LICENSE_KEY: &str = "
-----BEGIN OFFLINE LICENSE KEY-----
a45d25944d22c67e4f68343991fd42ad1cd7ea3845bbe3601f3c219a440c1ac9
-----END OFFLINE LICENSE KEY-----
";

const EVALUATION_CUSTOMER: &str = "Evaluation";

/// Extract plain text from PDF, DOCX and text files.
#[derive(Parser, Debug)]
#[command(name = "doctext")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input file(s) (.pdf, .docx or .txt)
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// Emit the last merged PDF line of each page instead of dropping it
    #[arg(long)]
    flush_last: bool,

    /// Start each PDF page from its first fragment instead of an empty line
    #[arg(long)]
    seed_sentinel: bool,

    /// Make one PDF fragment per glyph instead of per shown string
    #[arg(long)]
    per_glyph: bool,

    /// License key file (armored block)
    #[arg(long)]
    license: Option<PathBuf>,

    /// Customer name the license key was issued to
    #[arg(long, default_value = EVALUATION_CUSTOMER)]
    customer: String,

    /// Print the license and a "<FORMAT> Content:" header before each document
    #[arg(long)]
    headers: bool,

    /// Print extracted documents as JSON
    #[arg(long)]
    json: bool,

    /// Compose output text to Unicode NFC
    #[arg(long)]
    nfc: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn merger(&self) -> RunMerger {
        let final_flush = if self.flush_last {
            FinalFlush::Emit
        } else {
            FinalFlush::Drop
        };
        let sentinel = if self.seed_sentinel {
            SentinelMode::Seed
        } else {
            SentinelMode::Compare
        };
        RunMerger::new()
            .with_final_flush(final_flush)
            .with_sentinel(sentinel)
    }

    fn granularity(&self) -> Granularity {
        if self.per_glyph {
            Granularity::Glyph
        } else {
            Granularity::String
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let license = install_license(&args)?;
    if args.verbose {
        eprintln!("License: {}", license);
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.headers {
        writeln!(out, "License: {}", license)?;
    }

    let failed = run(&args, &mut out)?;
    if failed > 0 {
        anyhow::bail!("{} of {} file(s) failed", failed, args.input.len());
    }

    Ok(())
}

/// Extract every input and write the result to `out`.
///
/// A failing file is reported on stderr and the rest are still processed.
/// Returns the number of files that failed.
fn run<W: Write>(args: &Args, out: &mut W) -> Result<usize> {
    let merger = args.merger();
    let granularity = args.granularity();
    let renderer = TextRenderer::new().with_nfc(args.nfc);

    let mut documents = Vec::new();
    let mut failed = 0usize;

    for input_path in &args.input {
        if args.verbose {
            eprintln!("Processing: {}", input_path.display());
        }

        match process_file(input_path, merger, granularity) {
            Ok(document) => {
                if args.verbose {
                    eprintln!("  Found {} pages", document.pages.len());
                }
                if args.json {
                    documents.push(document);
                } else {
                    if args.headers {
                        writeln!(out, "{} Content:", document.format.label())?;
                    }
                    write!(out, "{}", renderer.render(&document))?;
                }
            }
            Err(e) => {
                failed += 1;
                eprintln!("Error processing {}: {:#}", input_path.display(), e);
            }
        }
    }

    if args.json {
        let json = serde_json::to_string_pretty(&documents).context("Failed to serialize output")?;
        writeln!(out, "{}", json)?;
    }

    Ok(failed)
}

/// Install the process-wide license before any document is opened.
fn install_license(args: &Args) -> Result<&'static doctext_core::LicenseKey> {
    let armored = match &args.license {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read license file {}", path.display()))?,
        None => {
            log::debug!("No license file given, using the evaluation key");
            EVALUATION_LICENSE_KEY.to_string()
        }
    };

    doctext_core::set_license_key(&armored, &args.customer).context("License initialization failed")
}

/// Detect the format of a file from its header, falling back to the extension.
fn detect_format(path: &Path, header: &[u8]) -> Option<DocumentFormat> {
    DocumentFormat::from_magic(header).or_else(|| {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(DocumentFormat::from_extension)
    })
}

/// Extract a single file.
fn process_file(
    input_path: &Path,
    merger: RunMerger,
    granularity: Granularity,
) -> Result<Document> {
    let file = File::open(input_path)
        .with_context(|| format!("Failed to open {}", input_path.display()))?;

    // Short files are fine: plain text is detected by extension.
    let mut header = Vec::with_capacity(8);
    file.take(8)
        .read_to_end(&mut header)
        .with_context(|| "Failed to read file header")?;

    let format = detect_format(input_path, &header)
        .ok_or_else(|| anyhow::anyhow!("Could not detect file format"))?;

    let file = File::open(input_path)?;
    let reader = BufReader::new(file);

    let filename = input_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown");

    let document = match format {
        DocumentFormat::Pdf => {
            log::debug!("Parsing as PDF");
            doctext_pdf::PdfParser::new()
                .with_merger(merger)
                .with_granularity(granularity)
                .parse(reader, filename)?
        }
        DocumentFormat::Docx => {
            log::debug!("Parsing as DOCX");
            doctext_docx::DocxParser::new().parse(reader, filename)?
        }
        DocumentFormat::Txt => {
            log::debug!("Reading as plain text");
            PlainTextReader::new().parse(reader, filename)?
        }
    };

    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Write `content` to a per-process scratch file and return its path.
    fn scratch_file(name: &str, content: &[u8]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("doctext-cli-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn path_arg(path: &Path) -> String {
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn test_process_file_reads_text_verbatim() {
        let path = scratch_file("verbatim.txt", b"first line\nsecond");
        let doc = process_file(&path, RunMerger::new(), Granularity::String).unwrap();

        assert_eq!(doc.format, DocumentFormat::Txt);
        assert_eq!(doc.filename, "verbatim.txt");
        assert_eq!(TextRenderer::new().render(&doc), "first line\nsecond");
    }

    #[test]
    fn test_process_file_rejects_garbage_pdf() {
        let path = scratch_file("garbage.pdf", b"not a pdf at all");
        assert!(process_file(&path, RunMerger::new(), Granularity::String).is_err());
    }

    #[test]
    fn test_process_file_missing_file() {
        let path = std::env::temp_dir().join("doctext-cli-does-not-exist.txt");
        assert!(process_file(&path, RunMerger::new(), Granularity::String).is_err());
    }

    #[test]
    fn test_run_continues_after_failure() {
        let broken = path_arg(&scratch_file("run-broken.pdf", b"not a pdf at all"));
        let notes = path_arg(&scratch_file("run-notes.txt", b"still here\n"));
        let args = Args::try_parse_from(["doctext", broken.as_str(), notes.as_str()]).unwrap();

        let mut out = Vec::new();
        let failed = run(&args, &mut out).unwrap();

        assert_eq!(failed, 1);
        assert_eq!(String::from_utf8(out).unwrap(), "still here\n");
    }

    #[test]
    fn test_run_headers_and_json() {
        let notes = path_arg(&scratch_file("run-headers.txt", b"body"));

        let args = Args::try_parse_from(["doctext", "--headers", notes.as_str()]).unwrap();
        let mut out = Vec::new();
        assert_eq!(run(&args, &mut out).unwrap(), 0);
        assert_eq!(String::from_utf8(out).unwrap(), "TXT Content:\nbody");

        let args = Args::try_parse_from(["doctext", "--json", notes.as_str()]).unwrap();
        let mut out = Vec::new();
        assert_eq!(run(&args, &mut out).unwrap(), 0);
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json[0]["format"], "Txt");
        assert_eq!(json[0]["pages"][0]["lines"][0], "body");
    }

    #[test]
    fn test_detect_format_prefers_magic() {
        assert_eq!(
            detect_format(Path::new("report.txt"), b"%PDF-1.4"),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(
            detect_format(Path::new("letter.bin"), &[0x50, 0x4B, 0x03, 0x04]),
            Some(DocumentFormat::Docx)
        );
    }

    #[test]
    fn test_detect_format_falls_back_to_extension() {
        assert_eq!(
            detect_format(Path::new("example.txt"), b"hi"),
            Some(DocumentFormat::Txt)
        );
        assert_eq!(detect_format(Path::new("image.png"), b"\x89PNG\r\n"), None);
        assert_eq!(detect_format(Path::new("noext"), b""), None);
    }

    #[test]
    fn test_args_default_merger_is_faithful() {
        let args = Args::try_parse_from(["doctext", "try.pdf"]).unwrap();
        let merger = args.merger();
        assert_eq!(merger.final_flush(), FinalFlush::Drop);
        assert_eq!(merger.sentinel(), SentinelMode::Compare);
        assert_eq!(args.granularity(), Granularity::String);
        assert_eq!(args.customer, EVALUATION_CUSTOMER);
    }

    #[test]
    fn test_args_merger_flags() {
        let args =
            Args::try_parse_from([
                "doctext",
                "--flush-last",
                "--seed-sentinel",
                "--per-glyph",
                "a.pdf",
                "b.docx",
            ])
            .unwrap();
        assert_eq!(args.input.len(), 2);
        let merger = args.merger();
        assert_eq!(merger.final_flush(), FinalFlush::Emit);
        assert_eq!(merger.sentinel(), SentinelMode::Seed);
        assert_eq!(args.granularity(), Granularity::Glyph);
    }

    #[test]
    fn test_args_require_input() {
        assert!(Args::try_parse_from(["doctext"]).is_err());
    }

    #[test]
    fn test_evaluation_key_is_valid() {
        let key = doctext_core::LicenseKey::parse(EVALUATION_LICENSE_KEY, EVALUATION_CUSTOMER).unwrap();
        assert_eq!(key.fingerprint(), "a45d2594");
    }
}
