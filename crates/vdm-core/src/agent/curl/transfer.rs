//! Single-stream HTTP GET into a `.part` file, with Range resume.
//!
//! Runs on a blocking thread. Stops between writes when the abort token is set.

use std::cell::Cell;
use std::path::Path;
use std::str;
use std::time::Duration;

use super::writer::PartWriter;
use crate::agent::TransferError;
use crate::config::TransferConfig;
use crate::control::AbortToken;

/// curl settings derived from `TransferConfig`.
#[derive(Debug, Clone)]
pub(crate) struct FetchOptions {
    pub connect_timeout: Duration,
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    pub user_agent: Option<String>,
}

impl From<&TransferConfig> for FetchOptions {
    fn from(cfg: &TransferConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            low_speed_limit: cfg.low_speed_limit_bytes,
            low_speed_time: Duration::from_secs(cfg.low_speed_time_secs),
            user_agent: cfg.user_agent.clone(),
        }
    }
}

fn curl_err(e: curl::Error) -> TransferError {
    TransferError::Failed(format!("curl: {}", e))
}

/// Response headers seen so far for the final response (reset on each status line,
/// so redirects don't leak their headers).
#[derive(Default)]
struct HeaderState {
    status: Cell<u32>,
    content_length: Cell<Option<u64>>,
    range_total: Cell<Option<u64>>,
}

impl HeaderState {
    fn observe(&self, line: &str) {
        let line = line.trim();
        if line.starts_with("HTTP/") {
            let code = line
                .split_whitespace()
                .nth(1)
                .and_then(|c| c.parse().ok())
                .unwrap_or(0);
            self.status.set(code);
            self.content_length.set(None);
            self.range_total.set(None);
            return;
        }
        let Some((name, value)) = line.split_once(':') else {
            return;
        };
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            self.content_length.set(value.parse().ok());
        } else if name.eq_ignore_ascii_case("content-range") {
            // bytes 100-999/1000
            let total = value.rsplit_once('/').and_then(|(_, t)| t.parse().ok());
            self.range_total.set(total);
        }
    }
}

/// Downloads `url` into `temp_path`. When `resume_from > 0` and a partial file
/// exists, asks for the remaining bytes with a Range request; a plain 200 reply
/// discards the partial data and starts over. `on_progress(done, total)` is
/// called after every write (`total` is 0 when unknown).
/// Returns the final size in bytes.
pub(crate) fn fetch_to_file(
    url: &str,
    temp_path: &Path,
    resume_from: u64,
    opts: &FetchOptions,
    token: &AbortToken,
    mut on_progress: impl FnMut(u64, u64),
) -> Result<u64, TransferError> {
    let (writer, existing) = if resume_from > 0 && temp_path.exists() {
        PartWriter::open_existing(temp_path)?
    } else {
        (PartWriter::create(temp_path)?, 0)
    };

    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(curl_err)?;
    easy.follow_location(true).map_err(curl_err)?;
    easy.max_redirections(10).map_err(curl_err)?;
    easy.connect_timeout(opts.connect_timeout).map_err(curl_err)?;
    easy.low_speed_limit(opts.low_speed_limit).map_err(curl_err)?;
    easy.low_speed_time(opts.low_speed_time).map_err(curl_err)?;
    if let Some(ua) = &opts.user_agent {
        easy.useragent(ua).map_err(curl_err)?;
    }
    if existing > 0 {
        // A plain Range header rather than CURLOPT_RESUME_FROM, which fails
        // the transfer when the server replies 200.
        easy.range(&format!("{}-", existing)).map_err(curl_err)?;
    }

    let headers = HeaderState::default();
    let offset = Cell::new(0u64);
    let started = Cell::new(false);
    let write_failed: Cell<Option<std::io::Error>> = Cell::new(None);

    let perform_result = {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                if let Ok(line) = str::from_utf8(data) {
                    headers.observe(line);
                }
                true
            })
            .map_err(curl_err)?;
        transfer
            .write_function(|data| {
                if token.is_aborted() {
                    return Ok(0); // abort transfer
                }
                let status = headers.status.get();
                if !(200..300).contains(&status) {
                    // Error page body; the status is reported after perform.
                    return Ok(data.len());
                }
                if !started.get() {
                    started.set(true);
                    if status == 206 {
                        offset.set(existing);
                    } else if existing > 0 {
                        tracing::debug!("server ignored range request, restarting from zero");
                        if let Err(e) = writer.truncate() {
                            write_failed.set(Some(e));
                            return Ok(0);
                        }
                    }
                }
                if let Err(e) = writer.write_at(offset.get(), data) {
                    write_failed.set(Some(e));
                    return Ok(0);
                }
                offset.set(offset.get() + data.len() as u64);
                let total = headers.range_total.get().unwrap_or_else(|| {
                    let base = if headers.status.get() == 206 { existing } else { 0 };
                    headers.content_length.get().map(|l| base + l).unwrap_or(0)
                });
                on_progress(offset.get(), total);
                Ok(data.len())
            })
            .map_err(curl_err)?;
        transfer.perform()
    };

    if token.is_aborted() {
        return Err(TransferError::Aborted);
    }
    if let Some(e) = write_failed.take() {
        return Err(TransferError::Io(e));
    }

    let code = easy.response_code().map_err(curl_err)?;
    if code == 416 && existing > 0 {
        // Range starting at the end of an already complete file.
        if headers.range_total.get() == Some(existing) {
            return Ok(existing);
        }
        tracing::debug!(
            existing,
            remote = ?headers.range_total.get(),
            "partial file does not match remote size, restarting from zero"
        );
        drop(writer);
        return fetch_to_file(url, temp_path, 0, opts, token, on_progress);
    }
    perform_result.map_err(curl_err)?;
    if !(200..300).contains(&code) {
        return Err(TransferError::Failed(format!("GET {} returned HTTP {}", url, code)));
    }

    writer.sync()?;
    Ok(offset.get())
}
