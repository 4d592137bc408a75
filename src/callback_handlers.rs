use super::*;
use crate::message_handlers::relay_youtube_download;

pub(super) async fn handle_youtube_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<YoutubeState>,
) -> Result<()> {
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(message) = q.message.clone() else {
        return Ok(());
    };
    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let Some((action, prompt_id)) = parse_callback_data(data) else {
        debug!("ignoring callback data {:?}", data);
        return Ok(());
    };
    let Some(mode) = MediaMode::from_action(action) else {
        debug!("ignoring unknown callback action {:?}", action);
        return Ok(());
    };

    let prompt = {
        let mut prompts = state.link_prompts.lock().await;
        lookup_link_prompt(&mut prompts, prompt_id, message.chat.id.0, message.id, now_ts())
    };
    let Some(prompt) = prompt else {
        return Ok(());
    };

    let status = bot
        .send_message(message.chat.id, "📥 Processing your request...")
        .reply_to_message_id(message.id)
        .await?;

    relay_youtube_download(
        &bot,
        message.chat.id,
        status.id,
        Some(message.id),
        &state,
        &prompt.url,
        mode,
    )
    .await
}
