use maud::{html, Markup, Render};

/// Round profile picture, falling back to the username's initial
pub struct Avatar {
    pub src: Option<String>,
    pub username: String,
    pub size: String,
}

impl Avatar {
    pub fn new(src: Option<&str>, username: &str) -> Self {
        Self {
            src: src.map(str::to_string),
            username: username.to_string(),
            size: "w-12 h-12".to_string(),
        }
    }

    pub fn size(mut self, size: &str) -> Self {
        self.size = size.to_string();
        self
    }

    fn initial(&self) -> String {
        self.username
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_else(|| "?".to_string())
    }
}

impl Render for Avatar {
    fn render(&self) -> Markup {
        html! {
            div class={"rounded-full overflow-hidden border-4 border-white shadow " (self.size)} {
                @if let Some(src) = &self.src {
                    img src=(src) alt={(self.username) "'s profile picture"} class="w-full h-full object-cover" {}
                } @else {
                    div class="bg-gradient-to-br from-rose-300 to-amber-300 w-full h-full flex items-center justify-center text-white font-bold" {
                        (self.initial())
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_initial() {
        let markup = Avatar::new(None, "ada").render().into_string();
        assert!(markup.contains(">A<"));
        assert!(!markup.contains("<img"));
    }

    #[test]
    fn renders_image_when_present() {
        let markup = Avatar::new(Some("https://cdn.test/a.png"), "ada")
            .render()
            .into_string();
        assert!(markup.contains(r#"src="https://cdn.test/a.png""#));
    }
}
