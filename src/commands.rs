use crate::Cli;
use crate::error::{ErrorKind, Result};
use dataname_catalog::{ListOptions, Order, PruneEvent, Strategy};
use dataname_config::{Config, StorageConfig};
use dataname_naming::date::string_to_date;
use dataname_naming::dataset::temporary_table_name;
use dataname_naming::{DatePattern, FilenameRecord, json_log_name, parse_in, parse_on};
use dataname_schema::SchemaIndex;
use dataname_storage::BackendHandle;
use dataname_storage::backend::LocalBackend;
use exn::{OptionExt, ResultExt};
use futures::StreamExt;
use std::io::Write;
use std::sync::Arc;

pub struct Context {
    config: Config,
    json: bool,
}

impl Context {
    /// Loads the configuration and applies command-line overrides.
    pub fn new(cli: &Cli) -> Result<Self> {
        let mut config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
        if let Some(root) = &cli.root {
            config.storage = Some(StorageConfig::Local { path: root.clone() });
        }
        if let Some(schemas) = &cli.schemas {
            config.schemas = Some(schemas.clone());
        }
        Ok(Self { config, json: cli.json })
    }

    async fn backend(&self) -> Result<BackendHandle> {
        let storage = self.config.storage.as_ref().ok_or_raise(|| {
            ErrorKind::Usage("no storage configured: set `storage` in the config file or pass --root".to_string())
        })?;
        match storage {
            StorageConfig::Local { path } => {
                let path = std::path::absolute(path).or_raise(|| ErrorKind::Storage)?;
                let backend = LocalBackend::new("local", path).or_raise(|| ErrorKind::Storage)?;
                Ok(Arc::new(backend))
            },
            #[cfg(feature = "s3")]
            StorageConfig::S3 {
                bucket,
                prefix,
                region,
                endpoint,
                key_id,
                key_secret,
            } => {
                let backend = dataname_storage::backend::S3Backend::new(
                    "s3",
                    bucket.clone(),
                    prefix.clone(),
                    region.clone(),
                    endpoint.clone(),
                    key_id.clone(),
                    key_secret.clone(),
                )
                .await
                .or_raise(|| ErrorKind::Storage)?;
                Ok(Arc::new(backend))
            },
            #[cfg(not(feature = "s3"))]
            StorageConfig::S3 { .. } => {
                exn::bail!(ErrorKind::Usage("S3 storage needs a build with the `s3` feature".to_string()))
            },
        }
    }

    fn schemas(&self) -> Result<Option<SchemaIndex>> {
        self.config
            .schemas
            .as_ref()
            .map(|folder| SchemaIndex::load(folder).or_raise(|| ErrorKind::Schema))
            .transpose()
    }

    fn emit(&self, record: &FilenameRecord) -> Result<()> {
        match self.json {
            true => emit_json(record),
            false => emit_line(&record.render_full()),
        }
    }
}

fn emit_line(line: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{line}").or_raise(|| ErrorKind::Output)
}

fn emit_json(record: &FilenameRecord) -> Result<()> {
    let line = serde_json::to_string(record).or_raise(|| ErrorKind::Output)?;
    emit_line(&line)
}

fn date_arg(value: &str) -> Result<time::Date> {
    string_to_date(value).ok_or_raise(|| ErrorKind::Usage(format!("`{value}` is not a YYYY-MM-DD date")))
}

pub fn parse(context: &Context, filenames: &[String], today: Option<&str>) -> Result<()> {
    let today = today.map(date_arg).transpose()?;
    for filename in filenames {
        let record = match today {
            Some(today) => parse_on(filename.as_str(), today),
            None => parse_in(filename.as_str(), context.config.calendar),
        };
        emit_json(&record)?;
    }
    Ok(())
}

pub fn render(date: &str, name: &str, extension: &str, version: u32) -> Result<()> {
    let record = FilenameRecord::new(date_arg(date)?, name, extension, version);
    emit_line(&record.render())
}

pub fn log_name(context: &Context, base: &str) -> Result<()> {
    let calendar = context.config.calendar;
    emit_line(&json_log_name(calendar.now(), base, calendar))
}

pub fn table_name(context: &Context, filename: &str, prefix: &str) -> Result<()> {
    let record = parse_in(filename, context.config.calendar);
    if !record.matched {
        exn::bail!(ErrorKind::Usage(format!("`{filename}` doesn't follow the naming convention")));
    }
    emit_line(&temporary_table_name(&record, prefix))
}

pub async fn list(
    context: &Context,
    folder: Option<&str>,
    order: Order,
    pattern: Option<String>,
    all: bool,
) -> Result<()> {
    let backend = context.backend().await?;
    let schemas = match all {
        true => None,
        false => context.schemas()?,
    };
    let options = ListOptions {
        order,
        schemas: schemas.as_ref(),
        pattern: pattern.map_or_else(|| context.config.date_pattern.clone(), DatePattern::new),
        calendar: context.config.calendar,
    };
    let records =
        dataname_catalog::ordered_listing(backend.as_ref(), folder, &options).await.or_raise(|| ErrorKind::Catalog)?;
    for record in &records {
        context.emit(record)?;
    }
    Ok(())
}

pub async fn resolve(
    context: &Context,
    candidate: &str,
    folder: Option<&str>,
    strategy: Option<Strategy>,
) -> Result<()> {
    let backend = context.backend().await?;
    let strategy = strategy.unwrap_or(context.config.strategy);
    let record =
        dataname_catalog::safe_filename(backend.as_ref(), candidate, folder, strategy, context.config.calendar)
            .await
            .or_raise(|| ErrorKind::Catalog)?;
    context.emit(&record)
}

pub async fn prune(context: &Context, prefix: Option<&str>, dry_run: bool) -> Result<()> {
    let index = context
        .schemas()?
        .ok_or_raise(|| ErrorKind::Usage("pruning needs a schema folder: set `schemas` or pass --schemas".to_string()))?;
    let backend = context.backend().await?;

    let mut failures = 0;
    let mut events = std::pin::pin!(dataname_catalog::prune(&backend, &index, prefix, dry_run, context.config.calendar));
    while let Some(event) = events.next().await {
        match event {
            Ok(PruneEvent::Deleted { key, .. }) => emit_line(&key)?,
            Ok(PruneEvent::Complete { kept, deleted }) => {
                tracing::info!(kept, deleted, dry_run, "Prune complete");
            },
            Ok(PruneEvent::Started { .. } | PruneEvent::Kept { .. }) => {},
            Err(err) => {
                failures += 1;
                tracing::warn!("{err:?}");
            },
        }
    }
    if failures > 0 {
        exn::bail!(ErrorKind::Usage(format!("{failures} object(s) could not be pruned")));
    }
    Ok(())
}

pub fn show_config(context: &Context) -> Result<()> {
    let rendered = serde_json::to_string_pretty(&context.config).or_raise(|| ErrorKind::Output)?;
    emit_line(&rendered)
}
