/// Chat Room example: a scripted conversation in one community.
///
/// Regulars chat, the engine collects their messages, then starts chiming
/// in. One user opts out of being mentioned, another teaches it over DM.
///
/// Run with: cargo run --example chat_room
use chatter_engine::core::pipeline::{ChatterEngine, IncomingMessage, Reply};
use chatter_engine::schema::config::EngineConfig;
use chatter_engine::schema::corpus::Weight;
use chatter_engine::schema::ids::{ChannelId, MessageId, ScopeId, UserId};

const GUILD: ScopeId = ScopeId(1);
const GENERAL: ChannelId = ChannelId(10);

const ALICE: UserId = UserId(100);
const BOB: UserId = UserId(200);
const CASS: UserId = UserId(300);

fn main() {
    let mut config = EngineConfig::default();
    config.min_texts = 4;
    config.max_words = 16;
    config.scope_defaults.channel = Some(GENERAL);
    config.scope_defaults.collection_probability = 1.0;
    config.scope_defaults.sending_probability = 0.5;

    let mut engine = ChatterEngine::builder()
        .seed(2026)
        .with_config(config)
        .build()
        .expect("Failed to build engine");

    engine.config_mut(GUILD).disabled_mentions.insert(BOB);
    engine.config_mut(GUILD).dm_learners.insert(CASS, Weight::new(3));

    let taught = engine.learn_direct(
        CASS,
        MessageId(1),
        "the garden needs watering before the sun gets too hot",
    );
    println!("[dm] Cass taught {} scope(s)", taught);
    println!();

    let script: &[(UserId, &str)] = &[
        (ALICE, "good morning, is anyone up for a walk in the garden?"),
        (BOB, "the garden is lovely this time of year (when it is not raining)"),
        (ALICE, "<@200> you said that last year too"),
        (BOB, "and last year it was lovely too, the roses were huge"),
        (CASS, "the roses need watering before the sun gets too hot"),
        (ALICE, "who is bringing coffee for the walk?"),
        (BOB, "i can bring coffee if someone brings the \"good\" mugs"),
        (CASS, "the good mugs are in the garden shed, next to the watering can"),
        (ALICE, "perfect, see everyone at the garden gate"),
        (BOB, "see you there, do not forget the coffee"),
    ];

    let mut now = 1_700_000_000_000u64;
    for (i, (author, content)) in script.iter().enumerate() {
        now += 20_000;
        let message = IncomingMessage {
            scope: GUILD,
            channel: GENERAL,
            author: *author,
            message_id: MessageId(100 + i as u64),
            content,
            author_is_bot: false,
            mentions_bot: i == 8,
            can_send: true,
        };

        println!("<{}> {}", name(*author), content);
        if let Some(reply) = engine.observe(&message, now) {
            print_reply(&reply);
        }
    }

    let stats = engine.stats(GUILD).expect("scope exists");
    println!();
    println!("--- {} texts collected, {} keys learned ---", stats.texts, stats.keys);
}

fn name(user: UserId) -> &'static str {
    match user {
        ALICE => "alice",
        BOB => "bob",
        CASS => "cass",
        _ => "someone",
    }
}

fn print_reply(reply: &Reply) {
    match reply.reply_to {
        Some(id) => println!("  <bot> (replying to #{}, after {}ms) {}", id.0, reply.delay_ms, reply.content),
        None => println!("  <bot> (after {}ms) {}", reply.delay_ms, reply.content),
    }
}
