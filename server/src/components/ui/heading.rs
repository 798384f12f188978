use maud::{html, Markup, Render};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
}

pub struct Heading {
    pub text: String,
    pub level: HeadingLevel,
    pub classes: Option<String>,
}

impl Heading {
    pub fn h1(text: &str) -> Self {
        Self::new(text, HeadingLevel::H1)
    }

    pub fn h2(text: &str) -> Self {
        Self::new(text, HeadingLevel::H2)
    }

    pub fn h3(text: &str) -> Self {
        Self::new(text, HeadingLevel::H3)
    }

    fn new(text: &str, level: HeadingLevel) -> Self {
        Self {
            text: text.to_string(),
            level,
            classes: None,
        }
    }

    pub fn with_classes(mut self, classes: &str) -> Self {
        self.classes = Some(classes.to_string());
        self
    }
}

impl Render for Heading {
    fn render(&self) -> Markup {
        let base = match self.level {
            HeadingLevel::H1 => "text-3xl font-bold mb-3",
            HeadingLevel::H2 => "text-2xl font-bold mb-2",
            HeadingLevel::H3 => "text-lg font-semibold mb-2",
        };
        let classes = format!(
            "{base} text-gray-800 {}",
            self.classes.as_deref().unwrap_or("")
        );

        match self.level {
            HeadingLevel::H1 => html! { h1 class=(classes) { (self.text) } },
            HeadingLevel::H2 => html! { h2 class=(classes) { (self.text) } },
            HeadingLevel::H3 => html! { h3 class=(classes) { (self.text) } },
        }
    }
}
