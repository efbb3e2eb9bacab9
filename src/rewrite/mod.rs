//! Streaming HTML rewrite pipeline.
//!
//! Applies an ordered list of independent selector→transform rules to the
//! origin response body in a single streaming pass. A rule whose selector
//! matches nothing is a no-op; the pipeline never buffers the full
//! document. Re-applying the pipeline to an already-rewritten document
//! duplicates the injected chrome; callers only run it on origin HTML.

pub mod scripts;

use std::sync::LazyLock;

use axum::body::Body;
use bytes::Bytes;
use futures::StreamExt;
use lol_html::html_content::ContentType;
use lol_html::{element, HtmlRewriter, Settings};
use regex::Regex;
use tracing::debug;

use crate::error::{GridError, Result};
use crate::resolve::RewriteDecision;
use crate::theme::{ImagePolicy, Intensity};

/// Content images inside entry figures, excluding explicit opt-outs.
/// Registered as separate rules; all share one transform.
const CONTENT_IMAGE_SELECTORS: [&str; 3] = [
    ".entry-content .wp-block-image figure:not(.no-carbon) img",
    ".entry-content figure.wp-block-image:not(.no-carbon) img",
    ".entry-content figure.wp-block-gallery figure:not(.no-carbon) img",
];

/// Site logo image (WordPress custom-logo class).
const LOGO_SELECTOR: &str = "img.custom-logo";

/// Text node echoing the resolved intensity label.
const CURRENT_INTENSITY_SELECTOR: &str = "#current-intensity";

/// Placeholder replaced by the rendered switcher control.
const SWITCHER_SELECTOR: &str = "#intensity-switcher";

/// Superseded inline toggle scripts, removed outright.
const LEGACY_TOGGLE_SELECTOR: &str = "script[data-legacy-toggle]";

/// Embedded YouTube players.
const YOUTUBE_IFRAME_SELECTOR: &str = "iframe[src*=\"youtube\"]";

/// WordPress media date-path segment, e.g. `2024/03/`.
static DATE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})/(\d{2})/").expect("valid date-path pattern"));

/// Video id in the embed URL forms YouTube serves.
static YOUTUBE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:youtu\.be/|/v/|/embed/|watch\?(?:.*&)?v=)([A-Za-z0-9_-]{11})")
        .expect("valid video-id pattern")
});

/// Everything a rewrite pass needs, copied out of the decision.
#[derive(Debug, Clone, Copy)]
pub struct RewritePlan {
    intensity: Intensity,
    label: &'static str,
}

impl RewritePlan {
    #[must_use]
    pub fn from_decision(decision: &RewriteDecision) -> Self {
        Self {
            intensity: decision.intensity,
            label: decision.label,
        }
    }
}

/// Rewrite a response body stream, returning the transformed body.
///
/// Input chunks are fed to the rewriter on a blocking task (the rewriter
/// itself is synchronous); output chunks flow through a channel into the
/// returned body. An upstream or rewriting error mid-stream aborts the
/// body; errors before the first byte are the dispatcher's to handle.
pub fn rewrite_stream<S, E>(decision: &RewriteDecision, upstream: S) -> Body
where
    S: futures::Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let plan = RewritePlan::from_decision(decision);
    debug!(intensity = plan.label, "Rewriting response body");

    let (in_tx, in_rx) = std::sync::mpsc::channel::<Bytes>();
    let (out_tx, out_rx) = futures::channel::mpsc::unbounded::<std::io::Result<Bytes>>();

    // Pump upstream chunks over to the rewriter task.
    let feeder_out = out_tx.clone();
    tokio::spawn(async move {
        let mut upstream = Box::pin(upstream);
        while let Some(chunk) = upstream.next().await {
            match chunk {
                Ok(bytes) => {
                    if in_tx.send(bytes).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = feeder_out.unbounded_send(Err(std::io::Error::other(e)));
                    break;
                }
            }
        }
    });

    tokio::task::spawn_blocking(move || {
        let sink_tx = out_tx.clone();
        let mut rewriter = HtmlRewriter::new(
            build_settings(plan),
            move |chunk: &[u8]| {
                let _ = sink_tx.unbounded_send(Ok(Bytes::copy_from_slice(chunk)));
            },
        );

        while let Ok(chunk) = in_rx.recv() {
            if let Err(e) = rewriter.write(&chunk) {
                let _ = out_tx.unbounded_send(Err(std::io::Error::other(e.to_string())));
                return;
            }
        }
        if let Err(e) = rewriter.end() {
            let _ = out_tx.unbounded_send(Err(std::io::Error::other(e.to_string())));
        }
    });

    Body::from_stream(out_rx)
}

/// Rewrite a complete document in one call. Test and tooling convenience;
/// the serving path uses [`rewrite_stream`].
pub fn rewrite_document(decision: &RewriteDecision, html: &str) -> Result<String> {
    let plan = RewritePlan::from_decision(decision);
    let mut output = Vec::new();

    let mut rewriter = HtmlRewriter::new(build_settings(plan), |chunk: &[u8]| {
        output.extend_from_slice(chunk);
    });
    rewriter
        .write(html.as_bytes())
        .map_err(|e| GridError::Other(format!("rewrite failed: {e}")))?;
    rewriter
        .end()
        .map_err(|e| GridError::Other(format!("rewrite failed: {e}")))?;

    String::from_utf8(output).map_err(|e| GridError::Other(format!("rewrite output not UTF-8: {e}")))
}

/// Assemble the rule list for a plan, in pipeline order.
fn build_settings(plan: RewritePlan) -> Settings<'static, 'static> {
    let theme = plan.intensity.spec();
    let mut handlers = Vec::new();

    // 1. Theme CSS custom properties on the root element.
    if plan.intensity.has_styling() {
        let accent = theme.accent;
        handlers.push(element!("html", move |el| {
            let css = format!(
                "--grid-bg: {}; --grid-highlight: {}; --grid-text: {};",
                accent.background, accent.highlight, accent.text
            );
            let style = append_style(el.get_attribute("style").as_deref(), &css);
            el.set_attribute("style", &style)?;
            Ok(())
        }));
    }

    // 2. Image policy over the content-figure selector set.
    match theme.image_policy {
        ImagePolicy::Full => {}
        ImagePolicy::LowRes => {
            for sel in CONTENT_IMAGE_SELECTORS {
                handlers.push(element!(sel, |el| {
                    if let Some(src) = el.get_attribute("src") {
                        el.set_attribute("src", &to_low_res(&src))?;
                    }
                    if let Some(srcset) = el.get_attribute("srcset") {
                        el.set_attribute("srcset", &to_low_res(&srcset))?;
                    }
                    Ok(())
                }));
            }
        }
        ImagePolicy::HiddenReveal => {
            for sel in CONTENT_IMAGE_SELECTORS {
                handlers.push(element!(sel, |el| {
                    let alt = el.get_attribute("alt").unwrap_or_default();
                    if let Some(src) = el.get_attribute("src") {
                        el.set_attribute("data-full-src", &src)?;
                        el.set_attribute("src", &to_low_res(&src))?;
                    }
                    if let Some(srcset) = el.get_attribute("srcset") {
                        el.set_attribute("data-full-srcset", &srcset)?;
                        el.set_attribute("srcset", &to_low_res(&srcset))?;
                    }
                    let style =
                        append_style(el.get_attribute("style").as_deref(), "display: none;");
                    el.set_attribute("style", &style)?;
                    el.after(&scripts::render_image_placeholder(&alt), ContentType::Html);
                    Ok(())
                }));
            }
        }
    }

    // 2b. YouTube embeds: facade under a live grid, bare link under the
    // dirtiest one. Unknown leaves the player alone.
    match plan.intensity {
        Intensity::Low | Intensity::Moderate => {
            handlers.push(element!(YOUTUBE_IFRAME_SELECTOR, |el| {
                let Some(src) = el.get_attribute("src") else {
                    return Ok(());
                };
                let Some(id) = youtube_video_id(&src) else {
                    return Ok(());
                };
                let class = el.get_attribute("class").unwrap_or_default();
                let params = src
                    .split_once('?')
                    .map(|(_, query)| query.to_string())
                    .unwrap_or_default();
                let width = el.get_attribute("width").unwrap_or_else(|| "100%".to_string());
                let height = el.get_attribute("height").unwrap_or_else(|| "auto".to_string());
                el.replace(
                    &scripts::render_lite_video(&id, &class, &params, &width, &height),
                    ContentType::Html,
                );
                Ok(())
            }));
        }
        Intensity::High => {
            handlers.push(element!(YOUTUBE_IFRAME_SELECTOR, |el| {
                let Some(src) = el.get_attribute("src") else {
                    return Ok(());
                };
                let Some(id) = youtube_video_id(&src) else {
                    return Ok(());
                };
                let title = el.get_attribute("title").unwrap_or_default();
                el.replace(&scripts::render_video_fallback(&id, &title), ContentType::Html);
                Ok(())
            }));
        }
        Intensity::Unknown => {}
    }

    // 2c. Web font loading is shed with the rest of the heavy assets.
    if matches!(theme.image_policy, ImagePolicy::HiddenReveal) {
        handlers.push(element!("link[href*=\"fonts.css\"]", |el| {
            el.remove();
            Ok(())
        }));
        handlers.push(element!("link[rel=\"preload\"][as=\"font\"]", |el| {
            el.remove();
            Ok(())
        }));
    }

    // 3. Logo swap to the theme variant asset.
    if plan.intensity.has_styling() {
        let variant = theme.logo_variant;
        handlers.push(element!(LOGO_SELECTOR, move |el| {
            el.set_attribute("src", &logo_asset(variant))?;
            Ok(())
        }));
    }

    // 4. Theme class on body.
    if let Some(class) = plan.intensity.body_class() {
        handlers.push(element!("body", move |el| {
            let classes = match el.get_attribute("class") {
                Some(existing) if !existing.is_empty() => format!("{existing} {class}"),
                _ => class.to_string(),
            };
            el.set_attribute("class", &classes)?;
            Ok(())
        }));
    }

    // 5. Echo the resolved label.
    let label = plan.label;
    handlers.push(element!(CURRENT_INTENSITY_SELECTOR, move |el| {
        el.set_inner_content(label, ContentType::Text);
        Ok(())
    }));

    // 6. Replace the switcher placeholder with the rendered control.
    handlers.push(element!(SWITCHER_SELECTOR, move |el| {
        el.replace(&scripts::render_switcher(label), ContentType::Html);
        Ok(())
    }));

    // 7. Drop superseded inline toggle scripts.
    handlers.push(element!(LEGACY_TOGGLE_SELECTOR, |el| {
        el.remove();
        Ok(())
    }));

    // 8. Interaction scripts, appended before </body>.
    let reveal = matches!(theme.image_policy, ImagePolicy::HiddenReveal);
    handlers.push(element!("body", move |el| {
        el.append(scripts::SWITCHER_SCRIPT, ContentType::Html);
        if reveal {
            el.append(scripts::REVEAL_SCRIPT, ContentType::Html);
        }
        el.append(scripts::NAV_SCRIPT, ContentType::Html);
        Ok(())
    }));

    Settings {
        element_content_handlers: handlers,
        ..Settings::default()
    }
}

/// Rewrite media date paths to their low-res variant.
fn to_low_res(value: &str) -> String {
    DATE_PATH.replace_all(value, "$1/$2/low-res/").into_owned()
}

/// Extract the 11-character video id from a YouTube embed URL.
fn youtube_video_id(src: &str) -> Option<String> {
    YOUTUBE_ID
        .captures(src)
        .map(|captures| captures[1].to_string())
}

/// Theme-variant logo asset path.
fn logo_asset(variant: &str) -> String {
    format!("/wp-content/uploads/site-logo-{variant}.svg")
}

/// Append CSS declarations to an existing inline style.
fn append_style(existing: Option<&str>, addition: &str) -> String {
    match existing {
        None | Some("") => addition.to_string(),
        Some(s) if s.trim_end().ends_with(';') => format!("{s} {addition}"),
        Some(s) => format!("{s}; {addition}"),
    }
}
