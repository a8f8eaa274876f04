use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use reqwest::blocking::Client;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{ExtractError, FetchedPage, Fetcher, PageQuery};

const USER_AGENT: &str = "muenster-events/0.1 (+https://www.muenster.de/veranstaltungskalender/)";

static FIELD_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("input[name], select[name], textarea[name]").expect("form field selector")
});
static OPTION_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("option").expect("option selector"));

/// Trims the characters the calendar pads its fields with.
pub fn strip(text: &str) -> &str {
    text.trim_matches(|c| matches!(c, ' ' | '\t' | '\n' | '\r'))
}

pub fn absolute_url(base: &str, href: &str) -> Option<String> {
    let href = strip(href);
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    let base_url = Url::parse(base).ok()?;
    base_url.join(href).ok().map(|u| u.to_string())
}

/// First text of the first node matching `selector`, stripped.
pub fn extract_field(page: &dyn PageQuery, selector: &str) -> Result<String, ExtractError> {
    page.query_text(selector)
        .into_iter()
        .next()
        .map(|text| strip(&text).to_string())
        .ok_or_else(|| ExtractError::FieldNotFound {
            selector: selector.to_string(),
        })
}

/// First value of `attr` on nodes matching `selector`, stripped.
pub fn extract_attribute(
    page: &dyn PageQuery,
    selector: &str,
    attr: &str,
) -> Result<String, ExtractError> {
    page.query_attribute(selector, attr)
        .into_iter()
        .next()
        .map(|value| strip(&value).to_string())
        .ok_or_else(|| ExtractError::FieldNotFound {
            selector: format!("{selector} @{attr}"),
        })
}

/// Selector for a `div` whose class attribute is exactly `class`.
pub fn div_with_class(class: &str) -> String {
    format!("div[class=\"{}\"]", class.replace('"', ""))
}

pub struct HtmlPage {
    url: String,
    document: Html,
}

impl HtmlPage {
    pub fn parse(url: &str, html: &str) -> Self {
        Self {
            url: url.to_string(),
            document: Html::parse_document(html),
        }
    }

    pub fn from_fetched(page: &FetchedPage) -> Self {
        Self::parse(&page.url, &page.body)
    }

    pub fn document(&self) -> &Html {
        &self.document
    }

    fn select_all(&self, selector: &str) -> Vec<ElementRef<'_>> {
        match Selector::parse(selector) {
            Ok(parsed) => self.document.select(&parsed).collect(),
            Err(err) => {
                debug!(selector, error = %err, "invalid selector");
                Vec::new()
            }
        }
    }
}

impl PageQuery for HtmlPage {
    fn url(&self) -> &str {
        &self.url
    }

    fn query_text(&self, selector: &str) -> Vec<String> {
        self.select_all(selector)
            .into_iter()
            .map(|element| own_text(element).unwrap_or_default())
            .collect()
    }

    fn query_attribute(&self, selector: &str, attr: &str) -> Vec<String> {
        self.select_all(selector)
            .into_iter()
            .filter_map(|element| element.value().attr(attr).map(str::to_string))
            .collect()
    }
}

/// The first non-blank text node directly inside `element`.
fn own_text(element: ElementRef<'_>) -> Option<String> {
    element
        .children()
        .filter_map(|child| child.value().as_text().map(|text| String::from(&**text)))
        .find(|text| !strip(text).is_empty())
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()
            .context("unable to build http client")?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn read(response: reqwest::blocking::Response, url: &str) -> Result<FetchedPage> {
        let response = response
            .error_for_status()
            .with_context(|| format!("non-success status for {url}"))?;
        let final_url = response.url().to_string();
        let body = response
            .text()
            .with_context(|| format!("unable to read response body for {url}"))?;
        Ok(FetchedPage {
            url: final_url,
            body,
        })
    }
}

impl Fetcher for HttpFetcher {
    fn get(&self, url: &str) -> Result<FetchedPage> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("request failed for {url}"))?;
        Self::read(response, url)
    }

    fn post_form(&self, url: &str, fields: &[(String, String)]) -> Result<FetchedPage> {
        debug!(url, fields = fields.len(), "POST form");
        let response = self
            .client
            .post(url)
            .form(fields)
            .send()
            .with_context(|| format!("form submission failed for {url}"))?;
        Self::read(response, url)
    }
}

/// Submits the form named `form_name` on `page`, keeping the form's own default
/// values and replacing those given in `values`.
pub fn submit_form(
    fetcher: &dyn Fetcher,
    page: &HtmlPage,
    form_name: &str,
    values: &[(&str, &str)],
) -> Result<FetchedPage> {
    let form_selector = Selector::parse(&format!("form[name=\"{}\"]", form_name.replace('"', "")))
        .map_err(|err| anyhow!("invalid form name {form_name:?}: {err}"))?;
    let form = page
        .document()
        .select(&form_selector)
        .next()
        .ok_or_else(|| anyhow!("no form named {form_name:?} on {}", page.url()))?;

    let action = form
        .value()
        .attr("action")
        .and_then(|href| absolute_url(page.url(), href))
        .unwrap_or_else(|| page.url().to_string());
    let method = form
        .value()
        .attr("method")
        .unwrap_or("get")
        .to_ascii_lowercase();

    let mut fields = form_defaults(form);
    for (name, value) in values {
        match fields.iter_mut().find(|(existing, _)| existing.as_str() == *name) {
            Some(field) => field.1 = value.to_string(),
            None => fields.push((name.to_string(), value.to_string())),
        }
    }

    if method == "post" {
        fetcher.post_form(&action, &fields)
    } else {
        let mut url = Url::parse(&action).with_context(|| format!("bad form action {action}"))?;
        url.query_pairs_mut()
            .extend_pairs(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        fetcher.get(url.as_str())
    }
}

fn form_defaults(form: ElementRef<'_>) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    for field in form.select(&FIELD_SELECTOR) {
        let element = field.value();
        let Some(name) = element.attr("name") else {
            continue;
        };
        let value = match element.name() {
            "select" => {
                let options: Vec<_> = field.select(&OPTION_SELECTOR).collect();
                options
                    .iter()
                    .find(|option| option.value().attr("selected").is_some())
                    .or_else(|| options.first())
                    .map(|option| {
                        option
                            .value()
                            .attr("value")
                            .map(str::to_string)
                            .unwrap_or_else(|| strip(&option.text().collect::<String>()).to_string())
                    })
            }
            "textarea" => Some(field.text().collect::<String>()),
            _ => {
                let kind = element.attr("type").unwrap_or("text").to_ascii_lowercase();
                match kind.as_str() {
                    "submit" | "image" | "reset" | "button" | "file" => None,
                    "checkbox" | "radio" if element.attr("checked").is_none() => None,
                    "checkbox" | "radio" => Some(element.attr("value").unwrap_or("on").to_string()),
                    _ => Some(element.attr("value").unwrap_or("").to_string()),
                }
            }
        };
        if let Some(value) = value {
            fields.push((name.to_string(), value));
        }
    }
    fields
}
