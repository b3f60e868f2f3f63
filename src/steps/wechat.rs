use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::{
    context::Payload,
    framework::{IntoState as _, StateError, StateResult},
    steps::{Step, StepContext, request_error},
};

/// Posts a text message to a WeChat Work group robot.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeChat;

impl WeChat {
    const WEBHOOK: &'static str = "https://qyapi.weixin.qq.com/cgi-bin/webhook/send";

    // Input
    const KEY: &'static str = "key";
    const CONTENT: &'static str = "content";
    const MENTIONED: &'static str = "mentioned";
    const URL: &'static str = "webhook";
    const PARAMS: [&'static str; 4] = [Self::KEY, Self::CONTENT, Self::MENTIONED, Self::URL];

    // Output
    const ERRCODE: &'static str = "errcode";
    const ERRMSG: &'static str = "errmsg";
    const OUTPUT: [&'static str; 2] = [Self::ERRCODE, Self::ERRMSG];
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    msgtype: &'static str,
    text: Text<'a>,
}

#[derive(Debug, Serialize)]
struct Text<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    mentioned_list: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct Reply {
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

impl Step for WeChat {
    fn parameters(&self) -> &'static [&'static str] {
        &Self::PARAMS
    }

    fn outputs(&self) -> &'static [&'static str] {
        &Self::OUTPUT
    }

    async fn execute(&self, cx: &StepContext, input: Payload) -> StateResult<Payload> {
        let key = input.require(Self::KEY).or_cancel()?;
        let webhook = input.optional(Self::URL).unwrap_or(Self::WEBHOOK);
        let message = Message {
            msgtype: "text",
            text: Text {
                content: input.parameter(Self::CONTENT),
                mentioned_list: input
                    .parameter(Self::MENTIONED)
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
        };

        debug!("sending message to WeChat robot…");
        let response = cx
            .client
            .post(webhook)
            .query(&[("key", key)])
            .json(&message)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if status.is_server_error() {
            return Err(StateError::Retry(anyhow!("WeChat robot responded {status}")));
        }
        if !status.is_success() {
            return Err(StateError::Cancelled(anyhow!("WeChat robot responded {status}")));
        }

        let reply = response.json::<Reply>().await.or_cancel()?;
        if reply.errcode != 0 {
            error!(
                "WeChat robot rejected the message: {} {}",
                reply.errcode, reply.errmsg
            );
            return Err(StateError::Cancelled(anyhow!(
                "WeChat robot rejected the message: {} {}",
                reply.errcode,
                reply.errmsg
            )));
        }
        info!("sent message to WeChat robot");

        Ok(Payload::from_pairs([
            (Self::ERRCODE, reply.errcode.to_string()),
            (Self::ERRMSG, reply.errmsg),
        ]))
    }
}
