use anyhow::Context;
use chrono::{Duration, Utc};
use rand::{seq::SliceRandom, Rng};
use serde_json::json;
use std::{env, sync::Arc};

use jobfilter::db::make_pool;
use jobfilter::families::{DeadLetterFamily, JobsFamily};
use jobfilter::filters::{CountMapping, FamilyBinding, FilterEngine, RawParams};
use jobfilter::jobs::{JobStatus, JobsRepo, NewJob};
use jobfilter::store::PgStore;

const QUEUES: &[Option<&str>] = &[Some("default"), Some("mailers"), Some("reports"), None];
const JOB_CLASSES: &[&str] = &["SendDigest", "ExportReport", "SyncAccount", "PurgeCache"];
const DLQ_REASONS: &[&str] = &["MAX_ATTEMPTS_EXCEEDED", "NON_RETRYABLE"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!(
            "jobfilterctl <command>\n\
             Commands:\n\
             - reset\n\
             - seed <n>\n\
             - page [--dlq] [key=value ...]\n\
             - facets [--dlq] [key=value ...]\n\
             \n\
             Uses DATABASE_URL or TEST_DATABASE_URL.\n"
        );
        std::process::exit(2);
    }

    dotenvy::dotenv().ok();
    let url = env::var("DATABASE_URL")
        .or_else(|_| env::var("TEST_DATABASE_URL"))
        .context("DATABASE_URL or TEST_DATABASE_URL must be set")?;

    let pool = make_pool(&url, None).await?;
    let repo = JobsRepo::new(pool.clone());

    match args[1].as_str() {
        "reset" => {
            repo.truncate().await?;
            println!("reset OK");
        }
        "seed" => {
            let n: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(10);
            seed(&repo, n).await?;
        }
        "page" => {
            let (binding, raw) = parse_filter_args(&args[2..])?;
            let engine = FilterEngine::from_raw(&raw, Arc::new(PgStore::new(pool)), binding)?;

            for job in engine.records().await? {
                println!(
                    "{} | {} | {:<10} | {:<14} | {}",
                    job.scheduled_at.to_rfc3339(),
                    job.id,
                    job.status,
                    job.queue_name.as_deref().unwrap_or("-"),
                    job.job_class
                );
            }

            println!("filtered: {}", engine.filtered_count().await?);
            match engine.next_page_params().await? {
                Some(next) => {
                    let args: Vec<String> = next.iter().map(|(k, v)| format!("{k}={v}")).collect();
                    println!("next: {}", args.join(" "));
                }
                None => println!("next: -"),
            }
        }
        "facets" => {
            let (binding, raw) = parse_filter_args(&args[2..])?;
            let engine = FilterEngine::from_raw(&raw, Arc::new(PgStore::new(pool)), binding)?;

            println!("queues:      {}", facet_line(&engine.queues().await?));
            println!("job_classes: {}", facet_line(&engine.job_classes().await?));

            let states = engine.states().await?;
            let line: Vec<String> = engine
                .state_names()?
                .iter()
                .map(|s| format!("{s}={}", states.get(s).unwrap_or(0)))
                .collect();
            println!("states:      {}", line.join(" "));
        }
        other => {
            eprintln!("Unknown command: {other}");
            std::process::exit(2);
        }
    }

    Ok(())
}

fn facet_line(counts: &CountMapping) -> String {
    if counts.is_empty() {
        return "-".to_string();
    }
    let parts: Vec<String> = counts.iter().map(|(k, n)| format!("{k}={n}")).collect();
    parts.join(" ")
}

fn parse_filter_args(args: &[String]) -> anyhow::Result<(FamilyBinding, RawParams)> {
    let mut binding = FamilyBinding::bound(JobsFamily::default());
    let mut raw = RawParams::new();

    for arg in args {
        if arg == "--dlq" {
            binding = FamilyBinding::bound(DeadLetterFamily::default());
            continue;
        }
        let (key, value) = arg
            .split_once('=')
            .with_context(|| format!("expected key=value, got {arg:?}"))?;
        raw.insert(key.to_string(), value.to_string());
    }

    Ok((binding, raw))
}

async fn seed(repo: &JobsRepo, n: usize) -> anyhow::Result<()> {
    let mut rng = rand::thread_rng();
    let now = Utc::now();

    for _ in 0..n {
        let queue = *QUEUES.choose(&mut rng).unwrap_or(&None);
        let class = *JOB_CLASSES.choose(&mut rng).unwrap_or(&"SendDigest");
        let scheduled_at = now + Duration::seconds(rng.gen_range(-3600..600));

        let mut job = NewJob::queued(queue, "adapter_job", scheduled_at)
            .with_payload(json!({ "job_class": class }));

        job = match rng.gen_range(0..6) {
            0 => job.with_error("TIMEOUT", "worker timed out"),
            1 => job.with_status(JobStatus::Running),
            2 => job.with_status(JobStatus::Succeeded).finished(now),
            3 => job
                .with_status(JobStatus::Failed)
                .with_error("PANIC", "job panicked")
                .finished(now),
            4 => {
                let reason = *DLQ_REASONS.choose(&mut rng).unwrap_or(&"NON_RETRYABLE");
                job.dead_lettered(reason).finished(now)
            }
            _ => job,
        };

        if rng.gen_bool(0.2) {
            job = job.with_cron_key(&format!("{}:hourly", class.to_lowercase()));
        }

        let status = job.status.as_str();
        let id = repo.insert(job).await?;
        println!("+ inserted {class} queue={} status={status} id={id}", queue.unwrap_or("-"));
    }

    println!("jobs total={}", repo.count_all().await?);
    Ok(())
}
