fn main() {
    heatquote_lib::run()
}
