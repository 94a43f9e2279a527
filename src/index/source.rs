use super::*;

pub(crate) trait BitcoinCoreRpcResultExt<T> {
  fn into_option(self) -> Result<Option<T>>;
}

impl<T> BitcoinCoreRpcResultExt<T> for Result<T, bitcoincore_rpc::Error> {
  fn into_option(self) -> Result<Option<T>> {
    match self {
      Ok(ok) => Ok(Some(ok)),
      Err(bitcoincore_rpc::Error::JsonRpc(bitcoincore_rpc::jsonrpc::error::Error::Rpc(
        bitcoincore_rpc::jsonrpc::error::RpcError { code: -8, .. },
      ))) => Ok(None),
      Err(bitcoincore_rpc::Error::JsonRpc(bitcoincore_rpc::jsonrpc::error::Error::Rpc(
        bitcoincore_rpc::jsonrpc::error::RpcError { message, .. },
      )))
        if message.ends_with("not found") =>
      {
        Ok(None)
      }
      Err(err) => Err(err.into()),
    }
  }
}

/// Yields the blocks of the best chain by height.
pub trait BlockSource: Send + Sync {
  /// Height of the best known header, which may be ahead of the blocks
  /// that are available.
  fn block_count(&self) -> Result<u32>;

  fn block_hash(&self, height: u32) -> Result<Option<BlockHash>>;

  fn block(&self, height: u32) -> Result<Option<Block>>;
}

/// Resolves the outputs of an already confirmed transaction.
pub trait TransactionOutputSource: Send + Sync {
  fn transaction_outputs(&self, txid: Txid) -> Result<Vec<TxOut>>;
}

impl BlockSource for Client {
  fn block_count(&self) -> Result<u32> {
    Ok(u32::try_from(self.get_blockchain_info()?.headers)?)
  }

  fn block_hash(&self, height: u32) -> Result<Option<BlockHash>> {
    self.get_block_hash(height.into()).into_option()
  }

  fn block(&self, height: u32) -> Result<Option<Block>> {
    let Some(hash) = BlockSource::block_hash(self, height)? else {
      return Ok(None);
    };

    self.get_block(&hash).into_option()
  }
}

impl TransactionOutputSource for Client {
  fn transaction_outputs(&self, txid: Txid) -> Result<Vec<TxOut>> {
    Ok(
      self
        .get_raw_transaction(&txid, None)
        .into_option()?
        .ok_or_else(|| anyhow!("transaction {txid} not found, is bitcoind running with -txindex?"))?
        .output,
    )
  }
}
