// ABOUTME: Dockerfile templates keyed by coarse language family
// ABOUTME: Used when a repository ships without its own Dockerfile

const START_COMMAND_PLACEHOLDER: &str = "{start_command}";

const PYTHON_TEMPLATE: &str = r#"
FROM python:3.11-slim
RUN useradd -m appuser
WORKDIR /app
RUN apt-get update && apt-get install -y --no-install-recommends gcc python3-dev \
    && rm -rf /var/lib/apt/lists/*
COPY requirements.txt .
RUN pip install --no-cache-dir -r requirements.txt || echo "Pip install warning"
COPY . .
USER appuser
ENV PYTHONUNBUFFERED=1
ENV PORT=8000
EXPOSE 8000 5000 8501
CMD {start_command}
"#;

const NODE_TEMPLATE: &str = r#"
FROM node:20-slim
WORKDIR /app
COPY package*.json ./
RUN npm install --only=production || echo "NPM install failed"
COPY . .
USER node
ENV PORT=3000
EXPOSE 3000 8080
CMD {start_command}
"#;

const GENERIC_TEMPLATE: &str = r#"
FROM ubuntu:22.04
RUN apt-get update && apt-get install -y bash curl
WORKDIR /app
COPY . .
ENV PORT=8080
EXPOSE 8080
CMD {start_command}
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Python,
    Node,
    Generic,
}

impl TemplateKind {
    /// Pick a template from a free-text language name such as "Python 3" or "TypeScript"
    pub fn from_language(language: &str) -> Self {
        let language = language.to_lowercase();
        if language.contains("python") {
            TemplateKind::Python
        } else if ["node", "javascript", "typescript"]
            .iter()
            .any(|needle| language.contains(needle))
        {
            TemplateKind::Node
        } else {
            TemplateKind::Generic
        }
    }

    fn template(&self) -> &'static str {
        match self {
            TemplateKind::Python => PYTHON_TEMPLATE,
            TemplateKind::Node => NODE_TEMPLATE,
            TemplateKind::Generic => GENERIC_TEMPLATE,
        }
    }

    /// Render the template with an already encoded exec-form CMD array
    pub fn render(&self, exec_form: &str) -> String {
        self.template()
            .replace(START_COMMAND_PLACEHOLDER, exec_form)
    }
}
