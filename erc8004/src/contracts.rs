//! Solidity bindings for the registries this crate talks to.
//!
//! Only the functions and events the workflows actually touch are declared.
//! Both interfaces are generated with `#[sol(rpc)]`, so each exposes a
//! `new(address, provider)` constructor returning a typed contract instance.
//! Events and calls also derive `Debug`, `PartialEq` and friends.

#![allow(missing_docs)]

use alloy::sol;

sol! {
    /// ERC-721 based agent identity registry.
    #[sol(rpc, all_derives)]
    interface IIdentityRegistry {
        function register(string agentURI) external returns (uint256 agentId);
        function ownerOf(uint256 tokenId) external view returns (address);
        function tokenURI(uint256 tokenId) external view returns (string);
        function getAgentWallet(uint256 agentId) external view returns (address);

        event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);
    }
}

sol! {
    /// Validation registry: agents request validation, validators respond.
    #[sol(rpc, all_derives)]
    interface IValidationRegistry {
        function validationRequest(
            address validatorAddress,
            uint256 agentId,
            string requestURI,
            bytes32 requestHash,
            uint64 snapshotId
        ) external;

        event ValidationRequest(
            address indexed validatorAddress,
            uint256 indexed agentId,
            string requestURI,
            bytes32 indexed requestHash
        );

        event ValidationResponse(
            address indexed validatorAddress,
            uint256 indexed agentId,
            bytes32 indexed requestHash,
            uint8 response,
            string responseURI,
            bytes32 responseHash,
            string tag
        );
    }
}
