#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    input: TestInput,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, input: TestInput) -> Self {
        Self { name, group, input }
    }

    pub fn small(name: &'static str, input: TestInput) -> Self {
        Self::new(name, TestGroup::Small, input)
    }

    pub fn normal(name: &'static str, input: TestInput) -> Self {
        Self::new(name, TestGroup::Normal, input)
    }

    pub fn large(name: &'static str, input: TestInput) -> Self {
        Self::new(name, TestGroup::Large, input)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn input(&self) -> &TestInput {
        &self.input
    }

    pub fn label(&self) -> &'static str {
        self.input().label
    }
}

/// A benchmark input: an `Accept` header, a fields mask or a JSON document.
#[derive(Debug, Copy, Clone)]
pub struct TestInput {
    label: &'static str,
    content: &'static str,
}

impl TestInput {
    pub const fn new(label: &'static str, content: &'static str) -> Self {
        Self { label, content }
    }

    pub fn content(&self) -> &'static str {
        self.content
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Normal,
    Large,
}

pub static CURL_ACCEPT: TestInput = TestInput::new("curl", "*/*");
pub static BROWSER_ACCEPT: TestInput =
    TestInput::new("browser", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8");
pub static WEIGHTED_ACCEPT: TestInput = TestInput::new(
    "weighted",
    "application/vnd.api+json;version=2;q=0.2, application/json;q=0.9, text/plain;format=flowed;q=0.5, \
     text/csv;q=0.3, application/xml;q=0.1, application/yaml;q=0.4, text/*;q=0.05",
);

pub static FLAT_MASK: TestInput = TestInput::new("flat", "id,task");
pub static NESTED_MASK: TestInput = TestInput::new("nested", "id,task,owner{name,address{city,country}},tags");

/// `count` todos with a nested owner, as a JSON array.
pub fn todos(count: usize) -> String {
    let items = (0..count)
        .map(|id| {
            format!(
                r#"{{"id":{id},"task":"task {id}","done":{},"owner":{{"name":"user {id}","address":{{"city":"Hangzhou","country":"CN"}}}},"tags":["a","b"]}}"#,
                id % 2 == 0
            )
        })
        .collect::<Vec<_>>();
    format!("[{}]", items.join(","))
}
