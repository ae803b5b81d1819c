//! Users command - list everyone seen in the ledger.

use super::Context;

pub async fn run(ctx: &Context) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let (ledger, _) = ctx.open_ledger(&config)?;

    for user in ledger.known_users() {
        println!("{}", user);
    }

    Ok(())
}
