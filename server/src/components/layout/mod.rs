use maud::{html, Markup, Render};

pub struct Page {
    pub title: String,
    pub content: Box<dyn Render>,
}

impl Page {
    pub fn new(title: &str, content: impl Render + 'static) -> Self {
        Self {
            title: title.to_string(),
            content: Box::new(content),
        }
    }
}

impl Render for Page {
    fn render(&self) -> Markup {
        html! {
            (maud::DOCTYPE)
            html lang="en" {
                head {
                    meta charset="utf-8";
                    title { (self.title) " · fitcheck" }
                    script src="https://unpkg.com/@tailwindcss/browser@4" {}
                    meta name="viewport" content="width=device-width, initial-scale=1.0";
                }

                body class="min-h-screen bg-white md:bg-gradient-to-br md:from-rose-50 md:to-amber-50 py-4 md:py-8 px-0 sm:px-4" {
                    (self.content.render())

                    div class="mt-6 md:mt-8 text-center text-sm text-gray-500" {
                        "fitcheck"
                    }
                }
            }
        }
    }
}

impl axum::response::IntoResponse for Page {
    fn into_response(self) -> axum::response::Response {
        self.render().into_response()
    }
}

pub struct Card {
    pub content: Box<dyn Render>,
    pub max_width: Option<String>,
}

impl Card {
    pub fn new(content: impl Render + 'static) -> Self {
        Self {
            content: Box::new(content),
            max_width: None,
        }
    }

    pub fn with_max_width(mut self, max_width: &str) -> Self {
        self.max_width = Some(max_width.to_string());
        self
    }
}

impl Render for Card {
    fn render(&self) -> Markup {
        let width_class = self.max_width.as_deref().unwrap_or("max-w-md");

        html! {
            div class={(width_class) " mx-auto bg-white rounded-xl border border-gray-100 shadow-md overflow-hidden w-full px-6 py-6"} {
                (self.content.render())
            }
        }
    }
}

/// Inline notice shown above a form, e.g. after a rejected login
pub struct Notice(pub String);

impl Render for Notice {
    fn render(&self) -> Markup {
        html! {
            div class="mb-4 rounded-md bg-red-50 border border-red-200 px-4 py-2 text-sm text-red-700" role="alert" {
                (self.0)
            }
        }
    }
}
