//! Subcommand implementations. Each prints a human summary, or JSON with `--json`.

use anyhow::{Context, Result, bail};
use beekon_client::{CacheWorker, HeaderName, HeaderValue, Method, Partition, Request, RevalidationOutcome};
use serde_json::json;

pub struct FetchArgs {
    pub url: String,
    pub method: String,
    pub headers: Vec<String>,
    pub data: Option<String>,
    pub include_body: bool,
}

pub async fn fetch(worker: &CacheWorker, args: FetchArgs, as_json: bool) -> Result<()> {
    let url = worker.resolve(&args.url)?;
    let method: Method = args
        .method
        .to_ascii_uppercase()
        .parse()
        .with_context(|| format!("invalid method {:?}", args.method))?;

    let mut request = Request::new(method, url);
    for raw in &args.headers {
        let (name, value) = parse_header(raw)?;
        request = request.with_header(name, value);
    }
    if let Some(data) = args.data {
        request = request.with_body(data);
    }

    let classification = worker.classify(&request.url);
    let url = request.url.to_string();
    let handled = worker.fetch(request).await?;

    // The runtime shuts down when the command returns, so refreshes are awaited.
    let revalidation = match handled.revalidation {
        Some(revalidation) => Some(match revalidation.wait().await {
            RevalidationOutcome::Refreshed => "refreshed".to_string(),
            RevalidationOutcome::NotStored { status } => format!("not stored (HTTP {status})"),
            RevalidationOutcome::Failed(reason) => format!("failed: {reason}"),
        }),
        None => None,
    };

    let response = &handled.response;
    let body = String::from_utf8_lossy(&response.body);
    if as_json {
        let out = json!({
            "url": url,
            "status": response.status.as_u16(),
            "source": handled.source.as_str(),
            "class": classification.class.as_str(),
            "strategy": classification.strategy.as_str(),
            "content_type": response.content_type(),
            "cached_at": response.cached_at().map(|ts| ts.to_rfc3339()),
            "bytes": response.body.len(),
            "revalidation": revalidation,
            "body": args.include_body.then(|| body.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{} {} ({}, {})", response.status.as_u16(), url, handled.source.as_str(), classification.class.as_str());
        if let Some(cached_at) = response.cached_at() {
            println!("cached at {}", cached_at.to_rfc3339());
        }
        if let Some(revalidation) = revalidation {
            println!("revalidation: {revalidation}");
        }
        if args.include_body {
            println!();
            println!("{body}");
        }
    }
    Ok(())
}

pub async fn install(worker: &CacheWorker, as_json: bool) -> Result<()> {
    let report = worker.install().await;
    let evicted = worker.activate().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&json!({ "install": report, "evicted": evicted }))?);
    } else {
        for url in &report.cached {
            println!("cached  {url}");
        }
        for failure in &report.failed {
            println!("failed  {} ({})", failure.url, failure.reason);
        }
        println!("evicted {evicted} entries from previous cache versions");
    }
    Ok(())
}

pub async fn sweep(worker: &CacheWorker, as_json: bool) -> Result<()> {
    let report = worker.sweep().await?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for (partition, removed) in &report.removed {
            println!("{partition:<12} {removed}");
        }
        println!("removed {} expired entries", report.total());
    }
    Ok(())
}

pub async fn clear(worker: &CacheWorker, partition: Option<&str>, as_json: bool) -> Result<()> {
    let partition = match partition {
        Some(name) => match Partition::parse(name) {
            Some(partition) => Some(partition),
            None => bail!("unknown partition {name:?}; expected static, api, images, metrics or pages"),
        },
        None => None,
    };

    let deleted = worker.clear(partition).await?;
    if as_json {
        println!("{}", json!({ "deleted": deleted }));
    } else {
        println!("deleted {deleted} entries");
    }
    Ok(())
}

pub async fn sync(worker: &CacheWorker, as_json: bool) -> Result<()> {
    let report = worker.sync().await?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "replayed {}, rejected {}, failed {}, dropped {}, {} still queued",
            report.replayed, report.rejected, report.failed, report.dropped, report.remaining
        );
    }
    Ok(())
}

pub async fn stats(worker: &CacheWorker, as_json: bool) -> Result<()> {
    let stats = worker.stats().await?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("backend       {} (cache v{})", stats.backend, stats.cache_version);
        for (partition, entries) in &stats.entries {
            println!("{partition:<13} {entries} entries");
        }
        println!("queued writes {}", stats.queued_writes);
    }
    Ok(())
}

/// Parse `name: value`.
fn parse_header(raw: &str) -> Result<(HeaderName, HeaderValue)> {
    let Some((name, value)) = raw.split_once(':') else {
        bail!("header {raw:?} is not in \"name: value\" form");
    };
    let name = HeaderName::from_bytes(name.trim().as_bytes()).with_context(|| format!("invalid header name in {raw:?}"))?;
    let value = HeaderValue::from_str(value.trim()).with_context(|| format!("invalid header value in {raw:?}"))?;
    Ok((name, value))
}
