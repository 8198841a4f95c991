/*!
Building a [`FileWriter`] from key-value configuration.

| Key | Value |
|---|---|
| `file` | The path template. Required. |
| `charset` | The name of a charset, like `UTF-8` or `US-ASCII`. |
| `format` | `line` or `json`. |
| `pattern` | The line pattern used by the `line` format. |
| `policies` | A comma-separated list of policies, like `startup, size: 10MB` or `daily: 06:00@UTC`. The date-based policies are `daily`, `weekly` and `monthly`. |
| `shared` | `true` if other processes write to the same files. |
| `buffer` | The number of bytes to buffer before writing through to disk, like `64KB`. |
| `backups` | The number of previous files to keep. |
| `latest` | The path of a link to the current file. |

Keys are matched ignoring case. Invalid values other than `file` are reported to the diagnostics sink and replaced by their defaults; unknown keys are ignored.
*/

use std::{collections::HashMap, sync::Arc};

use crate::{
    charset::Charset,
    diagnostics::Diagnostics,
    error::Error,
    format::Format,
    policy::{self, Policy},
    writer::{FileWriter, FileWriterBuilder},
};

impl FileWriterBuilder {
    /**
    Configure a builder from key-value pairs.

    Only a missing `file` is an error. See [the module docs](crate::config) for the supported keys.
    */
    pub fn from_config<K: AsRef<str>, V: AsRef<str>>(
        config: impl IntoIterator<Item = (K, V)>,
        diagnostics: impl Diagnostics + Send + Sync + 'static,
    ) -> Result<FileWriterBuilder, Error> {
        let config = config
            .into_iter()
            .map(|(k, v)| (k.as_ref().trim().to_ascii_lowercase(), v.as_ref().to_owned()))
            .collect::<HashMap<_, _>>();

        let diagnostics: Arc<dyn Diagnostics + Send + Sync> = Arc::new(diagnostics);
        let get = |key: &str| config.get(key).map(|value| value.as_str());

        let template = get("file")
            .map(str::trim)
            .filter(|template| !template.is_empty())
            .ok_or_else(|| Error::config("the `file` property is required"))?;

        let mut builder = FileWriterBuilder::new(template).diagnostics(diagnostics.clone());

        if let Some(charset) = get("charset") {
            builder = builder.charset(Charset::lookup_or_default(charset, &*diagnostics));
        }

        let pattern = get("pattern");
        let format = get("format").unwrap_or("line");

        builder = builder.format(
            Format::lookup(format, pattern, &*diagnostics).unwrap_or_else(|| {
                diagnostics.error(format_args!(
                    "unknown format {format:?}; falling back to line"
                ));

                Format::lookup("line", pattern, &*diagnostics).unwrap_or_default()
            }),
        );

        if let Some(policies) = get("policies") {
            builder = builder.policy(Policy::parse_list(policies, &*diagnostics));
        }

        if let Some(shared) = get("shared") {
            match shared.trim().to_ascii_lowercase().parse::<bool>() {
                Ok(shared) => builder = builder.shared(shared),
                Err(_) => diagnostics.error(format_args!(
                    "invalid value {shared:?} for `shared`; expected `true` or `false`"
                )),
            }
        }

        if let Some(buffer) = get("buffer") {
            match policy::parse_size(buffer) {
                Some(block_size) => builder = builder.block_size(block_size as usize),
                None => diagnostics.error(format_args!("invalid buffer size {buffer:?}")),
            }
        }

        if let Some(backups) = get("backups") {
            match backups.trim().parse::<usize>() {
                Ok(backups) => builder = builder.backups(backups),
                Err(_) => diagnostics.error(format_args!("invalid number of backups {backups:?}")),
            }
        }

        if let Some(latest) = get("latest").map(str::trim).filter(|latest| !latest.is_empty()) {
            builder = builder.latest(latest);
        }

        Ok(builder)
    }
}

impl FileWriter {
    /**
    Build a writer from key-value configuration.

    This is a shorthand for [`FileWriterBuilder::from_config`] followed by [`FileWriterBuilder::build`].
    */
    pub fn from_config<K: AsRef<str>, V: AsRef<str>>(
        config: impl IntoIterator<Item = (K, V)>,
        diagnostics: impl Diagnostics + Send + Sync + 'static,
    ) -> Result<FileWriter, Error> {
        FileWriterBuilder::from_config(config, diagnostics)?.build()
    }
}
