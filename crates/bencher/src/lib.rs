use std::fmt::Write;

#[derive(Debug, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    payload: Payload,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, kind: PayloadKind) -> Self {
        Self { name, group, payload: Payload::generate(kind, group.target_len()) }
    }

    pub fn small(name: &'static str, kind: PayloadKind) -> Self {
        Self::new(name, TestGroup::Small, kind)
    }

    pub fn normal(name: &'static str, kind: PayloadKind) -> Self {
        Self::new(name, TestGroup::Normal, kind)
    }

    pub fn large(name: &'static str, kind: PayloadKind) -> Self {
        Self::new(name, TestGroup::Large, kind)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }
}

#[derive(Clone, Copy, Debug)]
pub enum PayloadKind {
    Html,
    Json,
}

/// A generated response body.
#[derive(Debug, Clone)]
pub struct Payload {
    content_type: &'static str,
    body: Vec<u8>,
}

impl Payload {
    fn generate(kind: PayloadKind, target_len: usize) -> Self {
        let mut body = String::with_capacity(target_len + 128);
        let mut row = 0usize;
        match kind {
            PayloadKind::Html => {
                body.push_str("<!doctype html><html><body><table>");
                while body.len() < target_len {
                    let _ = write!(body, "<tr><td>{row}</td><td>item-{}</td><td>{}</td></tr>", row % 97, row * 31 % 1000);
                    row += 1;
                }
                body.push_str("</table></body></html>");
            }
            PayloadKind::Json => {
                body.push('[');
                while body.len() < target_len {
                    let _ = write!(body, r#"{{"id":{row},"name":"item-{}","score":{}}},"#, row % 97, row * 31 % 1000);
                    row += 1;
                }
                body.push_str("{}]");
            }
        }

        let content_type = match kind {
            PayloadKind::Html => "text/html; charset=utf-8",
            PayloadKind::Json => "application/json",
        };
        Self { content_type, body: body.into_bytes() }
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Normal,
    Large,
}

impl TestGroup {
    fn target_len(self) -> usize {
        match self {
            TestGroup::Small => 1024,
            TestGroup::Normal => 16 * 1024,
            TestGroup::Large => 256 * 1024,
        }
    }
}
