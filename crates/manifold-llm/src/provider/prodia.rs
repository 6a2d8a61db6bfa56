//! Prodia image generation adapter
//!
//! Serves `dall-e-3` requests by painting through one of three backend
//! spaces, selected by the credential token. The free-form prompt is first
//! turned into drawing tags by the built-in assistant backend; the
//! requested style and quality are validated against the space's
//! allow-lists, falling back to a random allowed style and the default
//! sampler. High-definition sizes trigger an optional upscale step.

use async_trait::async_trait;
use manifold_config::{AssistantConfig, ImageGenConfig, SpaceConfig};
use manifold_core::RequestContext;
use rand::seq::IndexedRandom;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{Adapter, RouteHints, SpaceKind, http_client};
use crate::error::LlmError;
use crate::protocol::openai::{ChatCompletionRequest, UpstreamChatResponse, WireMessage};
use crate::types::{GenerationRequest, ImageGeneration};

/// Model name this adapter answers to
const MODEL: &str = "dall-e-3";

const SD_MODELS: [&str; 6] = [
    "absolutereality_v181.safetensors [3d9d4d2b]",
    "anythingV5_PrtRE.safetensors [893e49b9]",
    "deliberate_v3.safetensors [afd9d2d4]",
    "dreamshaper_8.safetensors [9d40847d]",
    "meinamix_meinaV11.safetensors [b56ce717]",
    "revAnimated_v122.safetensors [3f4fefd9]",
];

const XL_MODELS: [&str; 5] = [
    "juggernautXL_v45.safetensors [e75f5471]",
    "dynavisionXL_0411.safetensors [c39cc051]",
    "dreamshaperXL10_alpha2.safetensors [c8afe2ef]",
    "realismEngineSDXL_v10.safetensors [af771c3f]",
    "sd_xl_base_1.0.safetensors [be9edd61]",
];

const GOOGLE_MODELS: [&str; 3] = ["imagen-2", "imagen-3", "imagen-3-fast"];

const SAMPLERS: [&str; 5] = ["Euler", "Euler a", "Heun", "DPM++ 2M Karras", "DDIM"];

const DEFAULT_SAMPLER: &str = "Euler a";

/// Suffix appended to the tag prompt reported back to the client
const PROMPT_SUFFIX: &str = ", {{{{by famous artist}}}, beautiful, masterpiece, 4k";

/// Instruction turning a free-form description into drawing tags
const TAG_PROMPT: &str = r#"Translate the following description into concise English drawing tags suitable for a diffusion model. Reply with a comma-separated tag list only, wrapped in triple quotes, like:
"""
tag1, tag2, tag3
"""

Description:
{{content}}"#;

/// One backend space endpoint
struct SpaceEndpoint {
    base_url: Url,
    api_key: Option<SecretString>,
}

impl SpaceEndpoint {
    fn from_config(config: &SpaceConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

/// Prodia image generation adapter
pub struct ProdiaAdapter {
    sd: Option<SpaceEndpoint>,
    xl: Option<SpaceEndpoint>,
    google: Option<SpaceEndpoint>,
    magnify_url: Option<Url>,
    assistant_model: String,
    assistant_base_url: Url,
    assistant_api_key: Option<SecretString>,
}

impl ProdiaAdapter {
    /// Create from image generation and assistant configuration
    pub fn new(imagegen: &ImageGenConfig, assistant: &AssistantConfig) -> Self {
        Self {
            sd: imagegen.sd.as_ref().map(SpaceEndpoint::from_config),
            xl: imagegen.xl.as_ref().map(SpaceEndpoint::from_config),
            google: imagegen.google.as_ref().map(SpaceEndpoint::from_config),
            magnify_url: imagegen.magnify_url.clone(),
            assistant_model: assistant.model.clone(),
            assistant_base_url: assistant.base_url.clone(),
            assistant_api_key: assistant.api_key.clone(),
        }
    }

    fn space_endpoint(&self, space: SpaceKind) -> Result<&SpaceEndpoint, LlmError> {
        let endpoint = match space {
            SpaceKind::Sd => self.sd.as_ref(),
            SpaceKind::Xl => self.xl.as_ref(),
            SpaceKind::Google => self.google.as_ref(),
        };
        endpoint.ok_or_else(|| LlmError::InvalidRequest(format!("image space {} is not configured", space_name(space))))
    }

    /// Turn the free-form prompt into drawing tags via the assistant backend
    async fn complete_tags(&self, context: &RequestContext, content: &str) -> Result<String, LlmError> {
        let wire = ChatCompletionRequest {
            model: self.assistant_model.clone(),
            messages: vec![WireMessage {
                role: "user".to_owned(),
                content: TAG_PROMPT.replace("{{content}}", content),
                name: None,
            }],
            stream: false,
            temperature: Some(0.8),
            max_tokens: Some(4096),
            top_k: None,
            stop: None,
            tools: Vec::new(),
        };

        let base = self.assistant_base_url.as_str().trim_end_matches('/');
        let mut builder = http_client(context)?.post(format!("{base}/v1/chat/completions")).json(&wire);
        if let Some(key) = &self.assistant_api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder.send().await.map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| LlmError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(LlmError::from_upstream_body(status.as_u16(), &text));
        }

        let body: UpstreamChatResponse =
            serde_json::from_str(&text).map_err(|e| LlmError::Parse(format!("malformed assistant response: {e}")))?;

        let message = body
            .choices
            .first()
            .map(|choice| choice.message.content.trim().to_owned())
            .unwrap_or_default();

        extract_tags(&message)
    }

    /// Submit a job to an sd/xl space and poll it to completion
    async fn run_job(
        &self,
        context: &RequestContext,
        endpoint: &SpaceEndpoint,
        style: &str,
        sampler: &str,
        tags: &str,
    ) -> Result<String, LlmError> {
        let client = http_client(context)?;
        let base = endpoint.base_url.as_str().trim_end_matches('/');

        let mut builder = client.post(format!("{base}/job")).json(&JobRequest {
            model: style,
            sampler,
            prompt: tags,
            negative_prompt: "lowres, bad anatomy, extra digits, watermark",
        });
        if let Some(key) = &endpoint.api_key {
            builder = builder.header("X-Prodia-Key", key.expose_secret());
        }

        let response = builder.send().await.map_err(|e| LlmError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(super::upstream_error(response).await);
        }

        let submitted: JobSubmitted = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(format!("malformed job response: {e}")))?;

        for _ in 0..30 {
            tokio::time::sleep(std::time::Duration::from_secs(2)).await;

            let mut builder = client.get(format!("{base}/job/{}", submitted.job));
            if let Some(key) = &endpoint.api_key {
                builder = builder.header("X-Prodia-Key", key.expose_secret());
            }

            let response = builder.send().await.map_err(|e| LlmError::Transport(e.to_string()))?;
            if !response.status().is_success() {
                return Err(super::upstream_error(response).await);
            }

            let job: JobStatus = response
                .json()
                .await
                .map_err(|e| LlmError::Parse(format!("malformed job status: {e}")))?;

            match job.status.as_str() {
                "succeeded" => {
                    return job.image_url.ok_or_else(|| {
                        LlmError::Parse("job succeeded without an image url".to_owned())
                    });
                }
                "failed" => {
                    return Err(LlmError::Upstream {
                        status: None,
                        message: "image job failed".to_owned(),
                    });
                }
                _ => {}
            }
        }

        Err(LlmError::Upstream {
            status: None,
            message: "image job did not finish in time".to_owned(),
        })
    }

    /// Single-shot generation against the google space
    async fn google_generate(
        &self,
        context: &RequestContext,
        endpoint: &SpaceEndpoint,
        style: &str,
        tags: &str,
    ) -> Result<String, LlmError> {
        let base = endpoint.base_url.as_str().trim_end_matches('/');
        let mut builder = http_client(context)?
            .post(format!("{base}/generate"))
            .json(&GoogleSpaceRequest { model: style, prompt: tags });
        if let Some(key) = &endpoint.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder.send().await.map_err(|e| LlmError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(super::upstream_error(response).await);
        }

        let generated: GoogleSpaceResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(format!("malformed generation response: {e}")))?;

        generated
            .images
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Parse("generation returned no images".to_owned()))
    }

    /// Upscale a result; failures keep the original image
    async fn magnify(&self, context: &RequestContext, url: String) -> String {
        let Some(magnify_url) = &self.magnify_url else {
            return url;
        };

        let request = match http_client(context) {
            Ok(client) => client.post(magnify_url.clone()).json(&MagnifyRequest { url: &url }),
            Err(e) => {
                tracing::error!(error = %e, "magnify skipped");
                return url;
            }
        };

        match request.send().await {
            Ok(response) if response.status().is_success() => match response.json::<MagnifyResponse>().await {
                Ok(magnified) => magnified.url,
                Err(e) => {
                    tracing::error!(error = %e, "magnify response malformed");
                    url
                }
            },
            Ok(response) => {
                tracing::error!(status = %response.status(), "magnify failed");
                url
            }
            Err(e) => {
                tracing::error!(error = %e, "magnify failed");
                url
            }
        }
    }
}

#[async_trait]
impl Adapter for ProdiaAdapter {
    fn name(&self) -> &'static str {
        "prodia"
    }

    fn matches(&self, context: &RequestContext, model: &str) -> Option<RouteHints> {
        if model != MODEL {
            return None;
        }

        let space = match context.credential_str() {
            Some("sk-prodia-sd") => SpaceKind::Sd,
            Some("sk-prodia-xl") => SpaceKind::Xl,
            Some("sk-google-xl") => SpaceKind::Google,
            _ => return None,
        };

        Some(RouteHints { space: Some(space) })
    }

    async fn generate(
        &self,
        context: &RequestContext,
        request: &GenerationRequest,
        hints: RouteHints,
    ) -> Result<ImageGeneration, LlmError> {
        let space = hints
            .space
            .ok_or_else(|| LlmError::InvalidRequest("no image space selected".to_owned()))?;
        let endpoint = self.space_endpoint(space)?;

        let tags = self.complete_tags(context, &request.prompt).await?;
        tracing::info!(space = space_name(space), tags = %tags, "generating image");

        let style = match_style(&request.style, space);
        let sampler = match_sampler(&request.quality, space);

        let url = match space {
            SpaceKind::Sd | SpaceKind::Xl => self.run_job(context, endpoint, &style, &sampler, &tags).await?,
            SpaceKind::Google => self.google_generate(context, endpoint, &style, &tags).await?,
        };

        let url = if wants_hd(&request.size) {
            self.magnify(context, url).await
        } else {
            url
        };

        let mut prompt = tags;
        prompt.push_str(PROMPT_SUFFIX);

        Ok(ImageGeneration {
            url,
            style,
            sampler,
            styles: space_styles(space),
            samplers: space_samplers(space),
            prompt,
        })
    }
}

/// Human name of a space
const fn space_name(space: SpaceKind) -> &'static str {
    match space {
        SpaceKind::Sd => "sd",
        SpaceKind::Xl => "xl",
        SpaceKind::Google => "google",
    }
}

/// Styles a space accepts
fn space_styles(space: SpaceKind) -> Vec<String> {
    let list: &[&str] = match space {
        SpaceKind::Sd => &SD_MODELS,
        SpaceKind::Xl => &XL_MODELS,
        SpaceKind::Google => &GOOGLE_MODELS,
    };
    list.iter().map(|s| (*s).to_owned()).collect()
}

/// Samplers a space accepts; the google space has none
fn space_samplers(space: SpaceKind) -> Vec<String> {
    match space {
        SpaceKind::Sd | SpaceKind::Xl => SAMPLERS.iter().map(|s| (*s).to_owned()).collect(),
        SpaceKind::Google => Vec::new(),
    }
}

/// Validate a requested style, falling back to a random allowed one
fn match_style(style: &str, space: SpaceKind) -> String {
    let list: &[&str] = match space {
        SpaceKind::Sd => &SD_MODELS,
        SpaceKind::Xl => &XL_MODELS,
        SpaceKind::Google => &GOOGLE_MODELS,
    };

    if list.contains(&style) {
        return style.to_owned();
    }

    (*list.choose(&mut rand::rng()).expect("allow-list is never empty")).to_owned()
}

/// Validate a requested sampler, falling back to the default
fn match_sampler(quality: &str, space: SpaceKind) -> String {
    match space {
        SpaceKind::Google => String::new(),
        SpaceKind::Sd | SpaceKind::Xl => {
            if SAMPLERS.contains(&quality) {
                quality.to_owned()
            } else {
                DEFAULT_SAMPLER.to_owned()
            }
        }
    }
}

/// Whether the requested size asks for the upscale step
fn wants_hd(size: &str) -> bool {
    size == "HD" || size.starts_with("1792x")
}

/// Pull the tag list out of the assistant's reply
///
/// Accepts triple-quote fences, a reply that lost its opening fence, or
/// code fences; inner double quotes are stripped either way.
fn extract_tags(message: &str) -> Result<String, LlmError> {
    let fenced = |open: &str| {
        let left = message.find(open)?;
        let right = message.rfind(open)?;
        (left + open.len() <= right).then(|| message[left + open.len()..right].replace('"', ""))
    };

    if let Some(tags) = fenced("\"\"\"") {
        return Ok(tags.trim().to_owned());
    }

    if let Some(stripped) = message.strip_suffix("\"\"\"") {
        return Ok(stripped.replace('"', "").trim().to_owned());
    }

    if let Some(tags) = fenced("```") {
        return Ok(tags.trim().to_owned());
    }

    tracing::error!(reply = %message, "assistant reply carries no tag block");
    Err(LlmError::Parse("tag generation failed".to_owned()))
}

// -- Space wire shapes --

#[derive(Serialize)]
struct JobRequest<'a> {
    model: &'a str,
    sampler: &'a str,
    prompt: &'a str,
    negative_prompt: &'a str,
}

#[derive(Deserialize)]
struct JobSubmitted {
    job: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatus {
    status: String,
    #[serde(default)]
    image_url: Option<String>,
}

#[derive(Serialize)]
struct GoogleSpaceRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct GoogleSpaceResponse {
    #[serde(default)]
    images: Vec<String>,
}

#[derive(Serialize)]
struct MagnifyRequest<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct MagnifyResponse {
    url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> ProdiaAdapter {
        let imagegen: ImageGenConfig = toml::from_str(
            r#"
            [sd]
            base_url = "https://sd.example.com"
            "#,
        )
        .unwrap();
        let assistant: AssistantConfig = toml::from_str(
            r#"
            model = "gpt-3.5-turbo"
            base_url = "http://127.0.0.1:8080"
            "#,
        )
        .unwrap();
        ProdiaAdapter::new(&imagegen, &assistant)
    }

    #[test]
    fn credential_selects_the_space() {
        let adapter = adapter();

        let hints = adapter
            .matches(&RequestContext::with_credential("sk-prodia-sd"), "dall-e-3")
            .unwrap();
        assert_eq!(hints.space, Some(SpaceKind::Sd));

        let hints = adapter
            .matches(&RequestContext::with_credential("sk-google-xl"), "dall-e-3")
            .unwrap();
        assert_eq!(hints.space, Some(SpaceKind::Google));

        assert!(adapter.matches(&RequestContext::with_credential("sk-other"), "dall-e-3").is_none());
        assert!(adapter.matches(&RequestContext::with_credential("sk-prodia-sd"), "gpt-4").is_none());
    }

    #[test]
    fn known_style_is_kept() {
        let style = match_style(SD_MODELS[2], SpaceKind::Sd);
        assert_eq!(style, SD_MODELS[2]);
    }

    #[test]
    fn unknown_style_falls_back_to_an_allowed_one() {
        let style = match_style("not-a-model", SpaceKind::Xl);
        assert!(XL_MODELS.contains(&style.as_str()));
    }

    #[test]
    fn unknown_sampler_falls_back_to_default() {
        assert_eq!(match_sampler("DPM++ 2M Karras", SpaceKind::Sd), "DPM++ 2M Karras");
        assert_eq!(match_sampler("mystery", SpaceKind::Sd), DEFAULT_SAMPLER);
        assert_eq!(match_sampler("mystery", SpaceKind::Google), "");
    }

    #[test]
    fn hd_sizes_trigger_upscale() {
        assert!(wants_hd("HD"));
        assert!(wants_hd("1792x1024"));
        assert!(!wants_hd("1024x1024"));
    }

    #[test]
    fn tags_extracted_from_triple_quotes() {
        let reply = "Sure, here you go:\n\"\"\"\nsunset, beach, \"golden hour\"\n\"\"\"";
        assert_eq!(extract_tags(reply).unwrap(), "sunset, beach, golden hour");
    }

    #[test]
    fn tags_extracted_when_opening_fence_is_missing() {
        let reply = "sunset, beach\"\"\"";
        assert_eq!(extract_tags(reply).unwrap(), "sunset, beach");
    }

    #[test]
    fn tags_extracted_from_code_fences() {
        let reply = "```\nsunset, beach\n```";
        assert_eq!(extract_tags(reply).unwrap(), "sunset, beach");
    }

    #[test]
    fn reply_without_fences_is_an_error() {
        assert!(matches!(extract_tags("no fences here"), Err(LlmError::Parse(_))));
    }
}
