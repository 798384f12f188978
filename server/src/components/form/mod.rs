use maud::{html, Markup, Render};

pub struct InputField {
    pub name: String,
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub value: Option<String>,
    pub input_type: String,
    pub required: bool,
}

impl InputField {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            label: None,
            placeholder: None,
            value: None,
            input_type: "text".to_string(),
            required: false,
        }
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = Some(placeholder.to_string());
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn input_type(mut self, input_type: &str) -> Self {
        self.input_type = input_type.to_string();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

impl Render for InputField {
    fn render(&self) -> Markup {
        html! {
            div class="mb-4" {
                @if let Some(label) = &self.label {
                    label for=(self.name) class="block text-sm font-medium text-gray-700 mb-1" { (label) }
                }
                input
                    type=(self.input_type)
                    name=(self.name)
                    id=(self.name)
                    value=(self.value.as_deref().unwrap_or(""))
                    placeholder=(self.placeholder.as_deref().unwrap_or(""))
                    class="w-full px-4 py-2 border border-gray-300 rounded-lg focus:ring-2 focus:ring-rose-400 text-gray-900"
                    required[self.required] {}
            }
        }
    }
}

pub struct Form {
    pub action: String,
    pub method: String,
    pub content: Box<dyn Render>,
    pub submit_label: String,
}

impl Form {
    pub fn post(action: &str, submit_label: &str, content: impl Render + 'static) -> Self {
        Self {
            action: action.to_string(),
            method: "post".to_string(),
            content: Box::new(content),
            submit_label: submit_label.to_string(),
        }
    }
}

impl Render for Form {
    fn render(&self) -> Markup {
        html! {
            form action=(self.action) method=(self.method) class="space-y-4" {
                (self.content.render())
                button type="submit" class="w-full rounded-lg bg-rose-500 px-4 py-2 font-medium text-white hover:bg-rose-600" {
                    (self.submit_label)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_renders_required_and_value() {
        let markup = InputField::new("email")
            .label("Email")
            .input_type("email")
            .value("a@x.com")
            .required(true)
            .render()
            .into_string();

        assert!(markup.contains(r#"type="email""#));
        assert!(markup.contains(r#"value="a@x.com""#));
        assert!(markup.contains("required"));
    }

    #[test]
    fn values_are_escaped() {
        let markup = InputField::new("username")
            .value("<script>")
            .render()
            .into_string();
        assert!(!markup.contains("<script>"));
    }
}
