use taxlot::adapters::{adapter_for, read_rows, run_adapter};
use taxlot::domain::RawValue;
use taxlot::{ErrorKind, RawFieldMapping};

const COINBASE_EXPORT: &str = "Transactions\n\
User,someone@example.com,abc\n\
\n\
Account,BTC Wallet\n\
Generated,2019-01-01\n\
\n\
\n\
Timestamp,Transaction Type,Asset,Quantity Transacted,USD Spot Price at Transaction,USD Subtotal,USD Total (inclusive of fees),USD Fees,Notes\n\
2018-01-01T10:00:00Z,Buy,BTC,0.1,14000,1400,1414.99,14.99,Bought 0.1 BTC\n\
2018-01-03T10:00:00Z,Send,BTC,0.05,15000,,,,Sent to wallet\n\
2018-01-04T10:00:00Z,Trade,BTC,0.01,15000,,,,Converted 0.01 BTC to ETH\n\
2018-02-01T10:00:00Z,Sell,BTC,0.02,9000,180,178.01,1.99,Sold 0.02 BTC\n";

#[test]
fn test_coinbase_export_with_preamble() {
    let adapter = adapter_for("coinbase").unwrap();
    let rows = read_rows(COINBASE_EXPORT.as_bytes(), adapter.header_rows()).unwrap();
    assert_eq!(rows.len(), 4);

    let out = run_adapter(adapter.as_ref(), rows).unwrap();
    assert_eq!(out.trades.len(), 2);
    assert_eq!(
        out.trades[1].mapping.get(RawFieldMapping::DIRECTION),
        Some(&RawValue::Text("sell".into()))
    );

    let kinds: Vec<ErrorKind> = out.rejected.iter().map(|e| e.error.kind()).collect();
    assert_eq!(kinds, vec![ErrorKind::NotATrade, ErrorKind::Unsupported]);
    assert_eq!(out.rejected[1].raw.extras["Notes"], "Converted 0.01 BTC to ETH");
}

#[test]
fn test_kraken_export() {
    let export = "txid,ordertxid,pair,time,type,ordertype,price,cost,fee,vol,margin,misc,ledgers\n\
TX1,O1,XETHXXBT,2017-06-01 10:00:00.1234,buy,limit,0.1,1,0.001,10,0,,L1\n\
TX2,O2,XXBTZUSD,2017-06-02 11:00:00.5,sell,market,2500,250,0.4,0.1,0,,L2\n";
    let adapter = adapter_for("kraken").unwrap();
    let out = run_adapter(adapter.as_ref(), read_rows(export.as_bytes(), 0).unwrap()).unwrap();
    let pairs: Vec<&RawValue> = out
        .trades
        .iter()
        .filter_map(|t| t.mapping.get(RawFieldMapping::CURRENCY_PAIR))
        .collect();
    assert_eq!(
        pairs,
        vec![
            &RawValue::Text("ETH-BTC".into()),
            &RawValue::Text("BTC-USD".into())
        ]
    );
}
