use crate::{
    context::Payload,
    framework::StateResult,
    steps::{Step, StepContext},
};

/// Prints `text` to stdout and passes it on.
#[derive(Debug, Clone, Copy, Default)]
pub struct Echo;

impl Echo {
    const TEXT: &'static str = "text";
    const PARAMS: [&'static str; 1] = [Self::TEXT];

    const OUTPUT: [&'static str; 1] = [Self::TEXT];
}

impl Step for Echo {
    fn parameters(&self) -> &'static [&'static str] {
        &Self::PARAMS
    }

    fn outputs(&self) -> &'static [&'static str] {
        &Self::OUTPUT
    }

    async fn execute(&self, _cx: &StepContext, input: Payload) -> StateResult<Payload> {
        let text = input.parameter(Self::TEXT);
        println!("{text}");

        Ok(Payload::from_pairs([(Self::TEXT, text.to_owned())]))
    }
}
