pub mod rcw;
