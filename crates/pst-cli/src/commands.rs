use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::Colorize;
use pst_arbiter::{InMemoryRegistry, NameBid};
use pst_engine::{Action, PermaStore, Signers, StoreValidator};
use pst_store::{ChunkRecord, DurableTableStore, ObjectRecord};
use pst_types::AccountName;
use serde_json::json;
use tracing::debug;

use crate::cli::*;
use crate::config::StoreConfig;

type Engine = PermaStore<DurableTableStore, InMemoryRegistry>;

/// An opened data directory.
struct Host {
    engine: Engine,
    registry_path: PathBuf,
    signer: Option<AccountName>,
    format: OutputFormat,
}

pub fn run_command(cli: Cli, settings: StoreConfig) -> anyhow::Result<()> {
    let host = Host::open(&cli.data_dir, &settings, cli.signer, cli.format)?;
    match cli.command {
        Command::Create(args) => host.act(|owner| Action::Create { owner, name: args.name }),
        Command::Reset(args) => host.act(|owner| Action::Reset { owner, name: args.name }),
        Command::Delete(args) => host.act(|owner| Action::Delete { owner, name: args.name }),
        Command::Publish(args) => host.act(|owner| Action::SetPublished {
            owner,
            name: args.name,
            published: !args.unset,
        }),
        Command::Freeze(args) => host.act(|owner| Action::Freeze { owner, name: args.name }),
        Command::Write(args) => {
            let data = read_payload(&args)?;
            host.act(|owner| Action::WriteChunk {
                owner,
                name: args.name,
                index: args.index,
                data,
            })
        }
        Command::Pop(args) => host.act(|owner| Action::PopChunk { owner, name: args.name }),
        Command::Show(args) => host.show(&args.name),
        Command::List => host.list(),
        Command::Chunk(args) => host.chunk(&args),
        Command::Bid(args) => host.bid(args.action),
        Command::Compact => host.compact(),
        Command::Check => host.check(),
    }
}

fn read_payload(args: &WriteArgs) -> anyhow::Result<Vec<u8>> {
    match (&args.hex, &args.file) {
        (Some(text), _) => hex::decode(text.trim()).context("chunk payload is not valid hex"),
        (None, Some(path)) => {
            fs::read(path).with_context(|| format!("reading {}", path.display()))
        }
        (None, None) => anyhow::bail!("one of --hex or --file is required"),
    }
}

impl Host {
    fn open(
        data_dir: &Path,
        settings: &StoreConfig,
        signer: Option<AccountName>,
        format: OutputFormat,
    ) -> anyhow::Result<Self> {
        let store = DurableTableStore::open(data_dir, settings.wal_config())
            .with_context(|| format!("opening store in {}", data_dir.display()))?;
        let registry_path = settings.registry_path(data_dir);
        let registry = InMemoryRegistry::load_json(&registry_path)
            .with_context(|| format!("loading registry {}", registry_path.display()))?;
        debug!(
            data_dir = %data_dir.display(),
            signer = ?signer,
            config = ?settings,
            "opened data directory"
        );
        Ok(Self {
            engine: PermaStore::with_config(store, registry, settings.engine_config()),
            registry_path,
            signer,
            format,
        })
    }

    /// Run an action signed by the `--as` account, which is also the actor.
    fn act(&self, build: impl FnOnce(AccountName) -> Action) -> anyhow::Result<()> {
        let signer = self
            .signer
            .context("this command needs a signer: pass --as <account>")?;
        let action = build(signer);
        let (label, name) = (action.label(), action.object());
        let record = self.engine.execute(&Signers::single(signer), action)?;

        match self.format {
            OutputFormat::Json => {
                let value = json!({ "action": label, "name": name, "record": record });
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            OutputFormat::Text => match record {
                Some(record) => println!(
                    "{} {} {}  {}",
                    "✓".green().bold(),
                    label,
                    name.to_string().yellow(),
                    summary(&record)
                ),
                None => println!("{} {} {}", "✓".green().bold(), label, name.to_string().yellow()),
            },
        }
        Ok(())
    }

    fn show(&self, name: &AccountName) -> anyhow::Result<()> {
        let record = self
            .engine
            .object(name)?
            .with_context(|| format!("object {name} does not exist"))?;
        let chunks = self.engine.chunks(name)?;

        match self.format {
            OutputFormat::Json => {
                let chunks: Vec<_> = chunks.iter().map(chunk_json).collect();
                let value = json!({ "name": name, "record": record, "chunks": chunks });
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            OutputFormat::Text => {
                println!("{}  {}", name.to_string().yellow().bold(), summary(&record));
                let total: usize = chunks.iter().map(ChunkRecord::len).sum();
                println!("  Bytes: {total}");
                for chunk in &chunks {
                    println!(
                        "  {:>4}  {:>8} B  {}",
                        chunk.index,
                        chunk.len(),
                        chunk.digest_hex().dimmed()
                    );
                }
            }
        }
        Ok(())
    }

    fn list(&self) -> anyhow::Result<()> {
        let objects = self.engine.objects()?;
        match self.format {
            OutputFormat::Json => {
                let values: Vec<_> = objects
                    .iter()
                    .map(|(name, record)| json!({ "name": name, "record": record }))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&values)?);
            }
            OutputFormat::Text if objects.is_empty() => println!("No objects."),
            OutputFormat::Text => {
                for (name, record) in &objects {
                    println!("{:<13}  {}", name.to_string().yellow(), summary(record));
                }
            }
        }
        Ok(())
    }

    fn chunk(&self, args: &ChunkArgs) -> anyhow::Result<()> {
        let chunk = self
            .engine
            .chunk(&args.name, args.index)?
            .with_context(|| format!("{} has no chunk {}", args.name, args.index))?;

        if let Some(path) = &args.out {
            fs::write(path, &chunk.data)
                .with_context(|| format!("writing {}", path.display()))?;
            println!(
                "{} wrote {} bytes to {}",
                "✓".green().bold(),
                chunk.len(),
                path.display()
            );
            return Ok(());
        }
        match self.format {
            OutputFormat::Json => {
                let mut value = chunk_json(&chunk);
                value["data"] = json!(hex::encode(&chunk.data));
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            OutputFormat::Text => println!("{}", hex::encode(&chunk.data)),
        }
        Ok(())
    }

    fn bid(&self, action: BidAction) -> anyhow::Result<()> {
        let registry = self.engine.registry();
        match action {
            BidAction::Set {
                suffix,
                bidder,
                amount,
                closed,
            } => {
                let bid = if closed {
                    NameBid::closed(suffix, bidder, amount)
                } else {
                    NameBid::open(suffix, bidder, amount)
                };
                registry.record_bid(bid)?;
                registry
                    .save_json(&self.registry_path)
                    .with_context(|| format!("saving {}", self.registry_path.display()))?;
                let state = if closed { "closed".red() } else { "open".green() };
                println!(
                    "{} bid on {} by {} ({})",
                    "✓".green().bold(),
                    suffix.to_string().yellow(),
                    bidder,
                    state
                );
            }
            BidAction::List => {
                let bids = registry.bids()?;
                match self.format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&bids)?),
                    OutputFormat::Text if bids.is_empty() => println!("No bids."),
                    OutputFormat::Text => {
                        for bid in &bids {
                            let state = if bid.is_closed() { "closed".red() } else { "open".green() };
                            println!(
                                "{:<13}  {:<13}  {:>12}  {}",
                                bid.newname.to_string().yellow(),
                                bid.high_bidder,
                                bid.high_bid.unsigned_abs(),
                                state
                            );
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn compact(&self) -> anyhow::Result<()> {
        let stats = self.engine.store().compact()?;
        match self.format {
            OutputFormat::Json => println!(
                "{}",
                json!({
                    "bytes_before": stats.bytes_before,
                    "bytes_after": stats.bytes_after,
                    "batches": stats.batches,
                })
            ),
            OutputFormat::Text => println!(
                "{} Compacted log: {} -> {} bytes ({} objects)",
                "✓".green().bold(),
                stats.bytes_before,
                stats.bytes_after,
                stats.batches
            ),
        }
        Ok(())
    }

    fn check(&self) -> anyhow::Result<()> {
        let report = StoreValidator::validate_store(self.engine.store())?;
        match self.format {
            OutputFormat::Json => {
                let violations: Vec<_> = report
                    .violations
                    .iter()
                    .map(|v| {
                        json!({
                            "name": v.name,
                            "kind": format!("{:?}", v.kind),
                            "description": v.description,
                        })
                    })
                    .collect();
                let value = json!({
                    "objects_checked": report.objects_checked,
                    "chunks_checked": report.chunks_checked,
                    "violations": violations,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            OutputFormat::Text => {
                for v in &report.violations {
                    println!("{} {}: {}", "✗".red().bold(), v.name, v.description);
                }
                if report.is_valid() {
                    println!(
                        "{} {} objects, {} chunks, no issues",
                        "✓".green().bold(),
                        report.objects_checked,
                        report.chunks_checked
                    );
                }
            }
        }
        if !report.is_valid() {
            anyhow::bail!("{} integrity violations", report.violations.len());
        }
        Ok(())
    }
}

fn summary(record: &ObjectRecord) -> String {
    let state = if record.is_frozen() {
        "frozen".cyan()
    } else if record.published {
        "published".green()
    } else {
        "open".normal()
    };
    format!(
        "holder {}  chunks {}  {}",
        record.holder, record.chunk_count, state
    )
}

fn chunk_json(chunk: &ChunkRecord) -> serde_json::Value {
    json!({
        "index": chunk.index,
        "len": chunk.len(),
        "digest": chunk.digest_hex(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn run(dir: &Path, args: &[&str]) -> anyhow::Result<()> {
        let mut argv = vec!["pstore", "--data-dir", dir.to_str().unwrap()];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv)?;
        let settings = StoreConfig::load(&cli.data_dir)?;
        run_command(cli, settings)
    }

    fn open(dir: &Path) -> Host {
        Host::open(dir, &StoreConfig::default(), None, OutputFormat::Text).unwrap()
    }

    fn name(s: &str) -> AccountName {
        AccountName::parse(s).unwrap()
    }

    #[test]
    fn mutations_need_a_signer() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(dir.path(), &["create", "abc"]).unwrap_err();
        assert!(err.to_string().contains("--as"));
    }

    #[test]
    fn object_lifecycle_persists_between_runs() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), &["--as", "alice", "create", "abc"]).unwrap();
        run(dir.path(), &["--as", "alice", "write", "abc", "0", "--hex", "6869"]).unwrap();
        run(dir.path(), &["--as", "alice", "write", "abc", "1", "--hex", "21"]).unwrap();
        run(dir.path(), &["--as", "alice", "publish", "abc"]).unwrap();
        run(dir.path(), &["--as", "alice", "freeze", "abc"]).unwrap();
        assert!(run(dir.path(), &["--as", "alice", "pop", "abc"]).is_err());

        let host = open(dir.path());
        let record = host.engine.object(&name("abc")).unwrap().unwrap();
        assert!(record.is_frozen());
        assert_eq!(record.chunk_count, 2);
        assert_eq!(
            host.engine.chunk(&name("abc"), 0).unwrap().unwrap().data,
            b"hi".to_vec()
        );
    }

    #[test]
    fn write_from_file_and_export_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.bin");
        let output = dir.path().join("out.bin");
        fs::write(&input, [1u8, 2, 3]).unwrap();
        let data_dir = dir.path().join("data");

        run(&data_dir, &["--as", "alice", "create", "abc"]).unwrap();
        run(
            &data_dir,
            &["--as", "alice", "write", "abc", "0", "--file", input.to_str().unwrap()],
        )
        .unwrap();
        run(&data_dir, &["chunk", "abc", "0", "--out", output.to_str().unwrap()]).unwrap();
        assert_eq!(fs::read(&output).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn bids_are_saved_and_enforced() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), &["bid", "set", "alice", "carol", "10"]).unwrap();
        assert!(run(dir.path(), &["--as", "alice", "create", "docs.alice"]).is_err());

        run(dir.path(), &["bid", "set", "alice", "carol", "10", "--closed"]).unwrap();
        run(dir.path(), &["--as", "carol", "create", "docs.alice"]).unwrap();

        let host = open(dir.path());
        let bids = host.engine.registry().bids().unwrap();
        assert_eq!(bids.len(), 1);
        assert!(bids[0].is_closed());
    }

    #[test]
    fn bad_hex_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), &["--as", "alice", "create", "abc"]).unwrap();
        let err = run(dir.path(), &["--as", "alice", "write", "abc", "0", "--hex", "xyz"])
            .unwrap_err();
        assert!(err.to_string().contains("hex"));
    }

    #[test]
    fn config_limit_applies() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pstore.toml"), "max_chunk_bytes = 1\n").unwrap();
        run(dir.path(), &["--as", "alice", "create", "abc"]).unwrap();
        assert!(run(dir.path(), &["--as", "alice", "write", "abc", "0", "--hex", "0102"]).is_err());
        run(dir.path(), &["--as", "alice", "write", "abc", "0", "--hex", "01"]).unwrap();
    }

    #[test]
    fn read_commands_succeed_on_populated_store() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), &["--as", "alice", "create", "abc"]).unwrap();
        run(dir.path(), &["--as", "alice", "write", "abc", "0", "--hex", "00ff"]).unwrap();
        for format in ["text", "json"] {
            run(dir.path(), &["--format", format, "show", "abc"]).unwrap();
            run(dir.path(), &["--format", format, "list"]).unwrap();
            run(dir.path(), &["--format", format, "chunk", "abc", "0"]).unwrap();
            run(dir.path(), &["--format", format, "bid", "list"]).unwrap();
            run(dir.path(), &["--format", format, "check"]).unwrap();
        }
        assert!(run(dir.path(), &["show", "missing"]).is_err());
    }

    #[test]
    fn compact_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), &["--as", "alice", "create", "abc"]).unwrap();
        for _ in 0..3 {
            run(dir.path(), &["--as", "alice", "write", "abc", "0", "--hex", "aa"]).unwrap();
        }
        run(dir.path(), &["--as", "alice", "create", "tmp"]).unwrap();
        run(dir.path(), &["--as", "alice", "delete", "tmp"]).unwrap();
        run(dir.path(), &["compact"]).unwrap();

        let host = open(dir.path());
        let objects = host.engine.objects().unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].1.chunk_count, 1);
    }
}
