use crate::view::format::{format_percent, format_price, time_ago};
use crate::view::{FetchState, Level, RateDisplay, ViewState};
use askama::Template;

/// The single page, flattened from a `ViewState` into display strings.
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pair: String,
    base: String,
    quote: String,
    // poll until the pending operation settles
    busy: bool,
    highlight: bool,
    price: Option<String>,
    message: &'static str,
    message_class: &'static str,
    change: Option<ChangeRow>,
    updated: String,
    can_save: bool,
    can_refresh: bool,
    fetching_ip: bool,
    backend_ip: Option<String>,
    toasts: Vec<Toast>,
}

struct ChangeRow {
    class: &'static str,
    arrow: &'static str,
    delta: String,
    percent: String,
    saved_rate: String,
    saved_ago: String,
}

struct Toast {
    is_error: bool,
    title: String,
    description: String,
}

impl IndexTemplate {
    pub fn new(state: &ViewState, now_ms: i64) -> Self {
        let mut parts = state.pair.split('/');
        let base = parts.next().unwrap_or("BTC").to_string();
        let quote = parts.next().unwrap_or("USDT").to_string();

        let (price, message, message_class) = match state.display {
            RateDisplay::Rate(snapshot) => (Some(format_price(snapshot.rate())), "", ""),
            RateDisplay::Prompt => (None, "Click Refresh to get the latest rate.", "muted"),
            RateDisplay::Loading => (None, "Loading...", "muted"),
            RateDisplay::FetchFailed => (None, "Could not fetch exchange rate.", "error"),
        };

        let change = state.change.zip(state.saved).map(|(change, saved)| ChangeRow {
            class: if change.is_positive { "up" } else { "down" },
            arrow: if change.is_positive { "↑" } else { "↓" },
            delta: format_price(change.delta.abs()),
            percent: format_percent(change.percent),
            saved_rate: format_price(saved.rate()),
            saved_ago: time_ago(saved.timestamp(), now_ms),
        });

        let updated = match state.current {
            Some(snapshot) => format!("Last updated {}", time_ago(snapshot.timestamp(), now_ms)),
            None => "Not updated yet".to_string(),
        };

        // newest first
        let toasts = state
            .notifications
            .iter()
            .rev()
            .map(|note| Toast {
                is_error: note.level == Level::Error,
                title: note.title.clone(),
                description: note.description.clone(),
            })
            .collect();

        Self {
            pair: state.pair.clone(),
            base,
            quote,
            busy: state.fetch == FetchState::Loading || state.saving || state.fetching_ip,
            highlight: state.highlight,
            price,
            message,
            message_class,
            change,
            updated,
            can_save: state.can_save,
            can_refresh: state.can_refresh,
            fetching_ip: state.fetching_ip,
            backend_ip: state.backend_ip.clone(),
            toasts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RateError;
    use crate::models::RateSnapshot;
    use crate::view::RateView;

    const NOW: i64 = 1_718_000_600_000;

    fn snap(rate: f64) -> RateSnapshot {
        RateSnapshot::new(rate, 1_718_000_000_000).unwrap()
    }

    fn render(view: &RateView) -> String {
        IndexTemplate::new(&view.state(), NOW).render().unwrap()
    }

    #[test]
    fn fresh_page_prompts_for_refresh() {
        let html = render(&RateView::new("BTC/USDT"));
        assert!(html.contains("Click Refresh to get the latest rate."));
        assert!(html.contains("<button disabled>Save</button>"));
        assert!(html.contains("<button>Refresh</button>"));
        assert!(html.contains("Not updated yet"));
        assert!(!html.contains("http-equiv=\"refresh\""));
    }

    #[test]
    fn shows_rate_and_comparison() {
        let mut view = RateView::new("BTC/USDT");
        view.apply_saved(Ok(Some(snap(64_000.0))));
        view.begin_refresh().unwrap();
        view.finish_refresh(Ok(snap(65_000.0)));

        let html = render(&view);
        assert!(html.contains("65,000.00 <span class=\"muted\">USDT</span>"));
        assert!(html.contains("↑ 1,000.00 (+1.56%)"));
        assert!(html.contains("Saved rate: 64,000.00 (10 minutes ago)"));
        assert!(html.contains("panel highlight"));
    }

    #[test]
    fn loading_page_polls() {
        let mut view = RateView::new("BTC/USDT");
        view.begin_refresh().unwrap();

        let html = render(&view);
        assert!(html.contains("http-equiv=\"refresh\""));
        assert!(html.contains("<button disabled>Refresh</button>"));
    }

    #[test]
    fn first_failure_shows_error_text_and_escaped_toast() {
        let mut view = RateView::new("BTC/USDT");
        view.begin_refresh().unwrap();
        view.finish_refresh(Err(RateError::Network("<refused>".into())));

        let html = render(&view);
        assert!(html.contains("Could not fetch exchange rate."));
        assert!(html.contains("toast error"));
        assert!(html.contains("&lt;refused&gt;"));
        assert!(!html.contains("<refused>"));
    }

    #[test]
    fn backend_ip_is_shown_escaped() {
        let mut view = RateView::new("BTC/USDT");
        view.begin_ip_lookup().unwrap();
        view.finish_ip_lookup(Ok("203.0.113.7<".into()));

        let html = render(&view);
        assert!(html.contains("Backend IP: <code>203.0.113.7&lt;</code>"));
    }
}
