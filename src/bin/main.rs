fn main() {
  ord_brc20::main();
}
