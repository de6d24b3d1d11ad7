use anyhow::Result;
use imfdata::{Client, make_key_str};

fn main() -> Result<()> {
    // RUST_LOG=imfdata=debug shows every request.
    env_logger::init();

    let datasets = Client::datasets(false)?;
    println!("{} public datasets", datasets.len());

    let client = Client::new("WEO", false)?;
    for (dim, codelist) in client.dimension_env()?.iter() {
        println!("{dim:<12} {}", codelist.unwrap_or("-"));
    }

    let (_, countries) = client.codelist("CL_WEO_COUNTRY")?;
    let key = make_key_str(&[
        vec![countries.code("United_States")?, countries.code("Netherlands")?],
        vec!["LUR"],
        vec!["A"],
    ]);

    let table = client.get_data_with_params(&key, &[("c[TIME_PERIOD]", "ge:2015")], true)?;
    for obs in &table {
        println!(
            "{} {} {}",
            obs.dimension("COUNTRY").unwrap_or("?"),
            obs.date.map(|d| d.to_string()).unwrap_or_default(),
            obs.value.map(|v| format!("{v:.1}")).unwrap_or_else(|| "NA".into()),
        );
    }
    Ok(())
}
