use maud::{DOCTYPE, Markup, PreEscaped, html};

pub mod devices;
pub mod metrics;

/// Colour variables the SVG charts draw with.
const THEME: &str = ":root{--background:#fff;--foreground:#1a202c;--muted:#e2e8f0;\
--accent:#0d73ad;--increase:#2f855a;--decrease:#c53030}";

pub fn page_shell(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
                style { (PreEscaped(THEME)) }
            }
            body {
                nav {
                    a href="/" { "metrics" }
                    " | "
                    a href="/devices" { "devices" }
                }
                main { (content) }
            }
        }
    }
}
