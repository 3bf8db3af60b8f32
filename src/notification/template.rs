use thiserror::Error;

pub const DEFAULT_TEMPLATE: &str = "\
{{flight.callsign}} is overhead heading {{flight.direction}}
Altitude: {{flight.alt_baro}} ft
Distance: {{flight.distanceFromReceiver}} nmi
From: {{flight.services.adsbdb.from.location}} {{flight.services.adsbdb.from.code}}
To: {{flight.services.adsbdb.to.location}} {{flight.services.adsbdb.to.code}}
{{flight.flightUrl}}
";

#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    #[error("Unclosed placeholder starting at byte {0}")]
    Unclosed(usize),

    #[error("Empty placeholder at byte {0}")]
    EmptyPlaceholder(usize),

    #[error("'{0}' is not defined in the notification context")]
    Undefined(String),
}

#[derive(Debug, PartialEq, Clone)]
enum Segment {
    Text(String),
    Placeholder(Vec<String>),
}

/// Text with `{{dotted.path}}` placeholders resolved against a JSON context.
///
/// The first path component must exist in the context; deeper components that
/// are missing render as empty text.
#[derive(Debug, Clone)]
pub struct NotificationTemplate {
    segments: Vec<Segment>,
}

impl NotificationTemplate {
    pub fn compile(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }
            let after_open = &rest[start + 2..];
            let end = after_open
                .find("}}")
                .ok_or(TemplateError::Unclosed(offset + start))?;

            let path = after_open[..end].trim();
            if path.is_empty() {
                return Err(TemplateError::EmptyPlaceholder(offset + start));
            }
            segments.push(Segment::Placeholder(
                path.split('.').map(str::to_string).collect(),
            ));

            let consumed = start + 2 + end + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(NotificationTemplate { segments })
    }

    pub fn render(&self, context: &serde_json::Value) -> Result<String, TemplateError> {
        let mut output = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => output.push_str(text),
                Segment::Placeholder(path) => output.push_str(&resolve(context, path)?),
            }
        }
        Ok(output)
    }
}

fn resolve(context: &serde_json::Value, path: &[String]) -> Result<String, TemplateError> {
    let Some((root, rest)) = path.split_first() else {
        return Ok(String::new());
    };
    let mut value = context
        .get(root)
        .ok_or_else(|| TemplateError::Undefined(root.clone()))?;

    for key in rest {
        match value.get(key) {
            Some(next) => value = next,
            None => return Ok(String::new()),
        }
    }

    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(string) => string.clone(),
        other => other.to_string(),
    })
}
