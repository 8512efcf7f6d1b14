//! Search command - query the knowledge base.

use anyhow::Result;
use chrono::Utc;
use clap::Args;

use super::{open_session, ready};
use crate::gateway::GatewayErrorKind;
use crate::results::{KindFilter, SortOrder, arrange, time_ago, truncate_text};

const SNIPPET_CHARS: usize = 200;

#[derive(Args)]
pub struct SearchCmd {
    /// Natural language query
    pub query: String,

    /// Max results (default from config)
    #[arg(short = 'k', long)]
    pub top_k: Option<u32>,

    /// Result ordering
    #[arg(short, long, value_enum, default_value_t = SortOrder::Relevance)]
    pub sort: SortOrder,

    /// Only show files of this kind
    #[arg(long, value_enum, default_value_t = KindFilter::All)]
    pub kind: KindFilter,
}

impl SearchCmd {
    pub async fn run(&self) -> Result<()> {
        let query = self.query.trim();
        if query.is_empty() {
            return Ok(());
        }

        let (config, session) = open_session()?;
        let gateway = ready(&session).await?;

        let start = std::time::Instant::now();
        let hits = match gateway.search(query, self.top_k.unwrap_or(config.top_k)).await {
            Ok(hits) => hits,
            Err(e) if e.kind() == GatewayErrorKind::NetworkFailure => {
                return Err(anyhow::Error::new(e).context("Search failed. Is the backend running?"));
            }
            Err(e) => return Err(e.into()),
        };
        let elapsed = start.elapsed().as_millis();

        let shown = arrange(&hits, self.sort, self.kind);
        println!("Found {} results in {}ms\n", shown.len(), elapsed);

        let now = Utc::now();
        for (i, hit) in shown.iter().enumerate() {
            match hit.date_added.as_deref().and_then(|d| time_ago(d, now)) {
                Some(age) => println!("{}. {} ({})", i + 1, hit.file_name, age),
                None => println!("{}. {}", i + 1, hit.file_name),
            }
            println!("   {}", truncate_text(hit.chunk_text.trim(), SNIPPET_CHARS));
            if let Some(ref thumb) = hit.thumbnail_url {
                println!("   thumbnail: {}", thumb);
            }
            println!();
        }

        Ok(())
    }
}
