//! Injected page chrome: the intensity switcher control and the
//! interaction scripts appended to `<body>`.

/// Wires the switcher control to the override cookie and reloads.
pub const SWITCHER_SCRIPT: &str = r"<script>
document.querySelectorAll('.intensity-select').forEach((el) => {
	el.addEventListener('change', (e) => {
		document.cookie = 'selected-intensity=' + e.target.value + '; path=/; max-age=31536000';
		window.location.reload();
	});
});
</script>";

/// Restores a hidden image from its sidecar attributes and removes the
/// placeholder.
pub const REVEAL_SCRIPT: &str = r"<script>
document.querySelectorAll('.show-image').forEach((el) => {
	el.addEventListener('click', (e) => {
		const placeholder = e.target.closest('.image-placeholder');
		const img = placeholder.previousElementSibling;
		img.setAttribute('src', img.getAttribute('data-full-src') || '');
		const srcset = img.getAttribute('data-full-srcset');
		if (srcset) {
			img.setAttribute('srcset', srcset);
		}
		img.style.removeProperty('display');
		img.removeAttribute('data-full-src');
		img.removeAttribute('data-full-srcset');
		placeholder.remove();
	});
});
</script>";

/// Collapsible navigation panel. Unrelated to theming but bundled at the
/// same injection point.
pub const NAV_SCRIPT: &str = r"<script>
const navToggle = document.querySelector('.nav-toggle');
if (navToggle) {
	navToggle.addEventListener('click', () => {
		const nav = document.querySelector('.site-nav');
		if (nav) {
			nav.classList.toggle('collapsed');
		}
	});
}
</script>";

/// Loader for the lite-youtube custom element, bundled with each embed.
pub const LITE_YOUTUBE_LOADER: &str = r#"<script type="module" src="https://cdn.jsdelivr.net/npm/@justinribeiro/lite-youtube@1.3.1/lite-youtube.js"></script>"#;

/// Render a lite-youtube facade in place of a YouTube iframe.
#[must_use]
pub fn render_lite_video(id: &str, class: &str, params: &str, width: &str, height: &str) -> String {
    format!(
        "<div style=\"width: {}; height: {}; margin-inline: auto;\">\
         <lite-youtube class=\"{}\" videoid=\"{}\" nocookie params=\"{}\"></lite-youtube>\
         </div>{LITE_YOUTUBE_LOADER}",
        css_dimension(width),
        css_dimension(height),
        escape_text(class),
        escape_text(id),
        escape_text(params),
    )
}

/// Render the no-playback fallback link used under the dirtiest grid.
#[must_use]
pub fn render_video_fallback(id: &str, title: &str) -> String {
    format!(
        "<div class=\"video-fallback\" style=\"aspect-ratio: 16 / 9; display: flex; \
         align-items: center; justify-content: center; background-color: var(--grid-bg);\">\
         <a href=\"https://www.youtube.com/watch?v={}\">Watch on YouTube: {}</a></div>",
        escape_text(id),
        escape_text(title),
    )
}

/// Bare numbers are pixel counts; anything else passes through.
fn css_dimension(value: &str) -> String {
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
        format!("{value}px")
    } else {
        value.to_string()
    }
}

/// Switcher option values, in display order.
const CHOICES: [(&str, &str); 4] = [
    ("low", "Low"),
    ("moderate", "Moderate"),
    ("high", "High"),
    ("live", "Live grid"),
];

/// Render the switcher control with the active choice pre-selected.
#[must_use]
pub fn render_switcher(active: &str) -> String {
    let mut options = String::new();
    for (value, title) in CHOICES {
        let selected = if value == active { " selected" } else { "" };
        options.push_str(&format!(
            "<option value=\"{value}\"{selected}>{title}</option>"
        ));
    }
    format!(
        "<label class=\"intensity-switcher\">Grid intensity \
         <select class=\"intensity-select\">{options}</select></label>"
    )
}

/// Render the placeholder shown over a hidden image.
#[must_use]
pub fn render_image_placeholder(alt: &str) -> String {
    let alt = escape_text(alt);
    format!(
        "<span class=\"image-placeholder\" style=\"display: inline-flex; flex-direction: column; \
         align-items: center; justify-content: space-evenly; padding: 0.5rem; \
         background-color: var(--grid-bg);\">\
         <span class=\"carbon-alt\">{alt}</span>\
         <button type=\"button\" class=\"show-image\">Show image</button>\
         </span>"
    )
}

/// Escape text destined for HTML content.
fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
