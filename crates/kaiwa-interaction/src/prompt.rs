//! Prompt construction.
//!
//! Turn instructions are minijinja templates rendered with the persona's
//! traits, the topic and the recent turns.

use kaiwa_core::persona::PersonaTraits;
use kaiwa_core::session::Turn;
use minijinja::{Environment, context};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),
}

const PERSONA: &str = "あなたは{{ persona.name }}です。{{ persona.personality }}な性格で、\
{{ persona.speaking_style }}話し方をします。主な興味は{{ interests }}です。";

const OPENING: &str = "{% include \"persona\" %}\n\
「{{ topic }}」について他のAIキャラクターと会話を始めてください。\
あなたの個性と話し方を活かして、簡潔に1-2文で発言してください。";

const ANSWER: &str = "{% include \"persona\" %}\n\
{{ question.speaker_name }}から「{{ question.text }}」と問いかけられました。\
「{{ topic }}」の流れに沿って、あなたらしくこの問いに答えてください。簡潔に1-2文で答えてください。";

const CONTINUATION: &str = "{% include \"persona\" %}\n\
「{{ topic }}」についての以下の会話の流れを受けて、あなたの個性を活かして自然に応答してください。\
簡潔に1-2文で発言してください。\n\n\
{% for turn in recent %}{{ turn.speaker_name }}: {{ turn.text }}\n{% endfor %}";

const MENTOR_FRAMING: &str = "\n\nメンターとして「{{ reference }}」の考え方を引き合いに出し、\
皆の思考が深まる問いを投げかけてください。";

const MENTOR_SUMMARY: &str = "{% include \"persona\" %}\n\
メンターとして、ここまでの「{{ topic }}」についての議論を総括してください。\
良かった点を一つ挙げ、皆が持ち帰るべき問いを一つ残して、2文以内で締めくくってください。";

const CLOSING_REACTION: &str = "{% include \"persona\" %}\n\
{{ mentor_name }}が「{{ summary }}」と議論を総括しました。\
あなたらしく、総括への感想と今後の抱負を簡潔に1文で述べてください。";

const REPLY: &str = "{% include \"persona\" %}\n\
{% if original %}あなたが先ほど「{{ original }}」と発言したところ、{% endif %}\
ユーザー「{{ user_name }}」から「{{ user_text }}」とリプライされました。\
あなたの個性を活かして、この内容に対して適切に応答してください。簡潔に1-2文で返答してください。";

const MENTION: &str = "{% include \"persona\" %}\n\
ユーザー「{{ user_name }}」から「{{ user_text }}」と言われました。\
あなたの個性を活かして自然に応答してください。簡潔に1-2文で返答し、会話を無理に続けようとしないでください。";

/// Number of interests quoted in every prompt.
const PROMPT_INTERESTS: usize = 2;

/// Renders the instruction for each kind of turn.
pub struct PromptBuilder {
    env: Environment<'static>,
}

impl PromptBuilder {
    pub fn new() -> Result<Self, PromptError> {
        let mut env = Environment::new();
        env.add_template("persona", PERSONA)?;
        env.add_template("opening", OPENING)?;
        env.add_template("answer", ANSWER)?;
        env.add_template("continuation", CONTINUATION)?;
        env.add_template("mentor_framing", MENTOR_FRAMING)?;
        env.add_template("mentor_summary", MENTOR_SUMMARY)?;
        env.add_template("closing_reaction", CLOSING_REACTION)?;
        env.add_template("reply", REPLY)?;
        env.add_template("mention", MENTION)?;
        Ok(Self { env })
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> Result<String, PromptError> {
        Ok(self.env.get_template(name)?.render(ctx)?)
    }

    /// First turn of a conversation.
    pub fn opening(&self, traits: &PersonaTraits, topic: &str) -> Result<String, PromptError> {
        self.render(
            "opening",
            context! {
                persona => traits,
                interests => traits.top_interests(PROMPT_INTERESTS),
                topic => topic,
            },
        )
    }

    /// A turn that answers `question`.
    pub fn answer(
        &self,
        traits: &PersonaTraits,
        topic: &str,
        question: &Turn,
    ) -> Result<String, PromptError> {
        self.render(
            "answer",
            context! {
                persona => traits,
                interests => traits.top_interests(PROMPT_INTERESTS),
                topic => topic,
                question => question,
            },
        )
    }

    /// An ordinary turn reacting to the `recent` turns.
    pub fn continuation(
        &self,
        traits: &PersonaTraits,
        topic: &str,
        recent: &[Turn],
    ) -> Result<String, PromptError> {
        self.render(
            "continuation",
            context! {
                persona => traits,
                interests => traits.top_interests(PROMPT_INTERESTS),
                topic => topic,
                recent => recent,
            },
        )
    }

    /// Appends mentor framing citing `reference` to a rendered prompt.
    pub fn with_mentor_framing(&self, prompt: String, reference: &str) -> Result<String, PromptError> {
        let framing = self.render("mentor_framing", context! { reference => reference })?;
        Ok(prompt + &framing)
    }

    pub fn mentor_summary(&self, traits: &PersonaTraits, topic: &str) -> Result<String, PromptError> {
        self.render(
            "mentor_summary",
            context! {
                persona => traits,
                interests => traits.top_interests(PROMPT_INTERESTS),
                topic => topic,
            },
        )
    }

    pub fn closing_reaction(
        &self,
        traits: &PersonaTraits,
        mentor_name: &str,
        summary: &str,
    ) -> Result<String, PromptError> {
        self.render(
            "closing_reaction",
            context! {
                persona => traits,
                interests => traits.top_interests(PROMPT_INTERESTS),
                mentor_name => mentor_name,
                summary => summary,
            },
        )
    }

    /// A persona answering a user who replied to one of its messages.
    pub fn reply(
        &self,
        traits: &PersonaTraits,
        original: Option<&str>,
        user_name: &str,
        user_text: &str,
    ) -> Result<String, PromptError> {
        self.render(
            "reply",
            context! {
                persona => traits,
                interests => traits.top_interests(PROMPT_INTERESTS),
                original => original,
                user_name => user_name,
                user_text => user_text,
            },
        )
    }

    /// A persona answering a user who mentioned the bot.
    pub fn mention(
        &self,
        traits: &PersonaTraits,
        user_name: &str,
        user_text: &str,
    ) -> Result<String, PromptError> {
        self.render(
            "mention",
            context! {
                persona => traits,
                interests => traits.top_interests(PROMPT_INTERESTS),
                user_name => user_name,
                user_text => user_text,
            },
        )
    }
}
